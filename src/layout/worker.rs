//! Background layout thread.
//!
//! The worker owns the [`ForceLayoutEngine`] exclusively. While the
//! simulation is hot it alternates between draining pending commands and
//! running one frame-budgeted batch, yielding between batches; once cooled
//! (or stopped) it blocks on the command channel until told otherwise.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use super::engine::{FRAME_BUDGET, ForceLayoutEngine};
use super::protocol::{Generation, LayoutCommand, LayoutEvent};

/// Invoked after every emitted event so the UI can schedule a repaint.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

pub(super) struct LayoutWorker {
    command_rx: Receiver<LayoutCommand>,
    event_tx: Sender<LayoutEvent>,
    waker: Option<Waker>,
    engine: Option<ForceLayoutEngine>,
    generation: Generation,
    alive: bool,
}

impl LayoutWorker {
    pub(super) fn new(
        command_rx: Receiver<LayoutCommand>,
        event_tx: Sender<LayoutEvent>,
        waker: Option<Waker>,
    ) -> Self {
        Self {
            command_rx,
            event_tx,
            waker,
            engine: None,
            generation: 0,
            alive: true,
        }
    }

    pub(super) fn run(mut self) {
        tracing::debug!("layout worker started");
        self.emit(LayoutEvent::Loaded);

        while self.alive {
            if self.is_ticking() {
                self.process_commands();
                if self.alive && self.is_ticking() {
                    self.run_batch();
                    thread::yield_now();
                }
            } else {
                match self.command_rx.recv() {
                    Ok(command) => self.handle_command(command),
                    Err(_) => self.alive = false,
                }
            }
        }

        tracing::debug!("layout worker stopped");
    }

    fn is_ticking(&self) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|engine| engine.state().is_running)
    }

    fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(command) => self.handle_command(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.alive = false;
                    break;
                }
            }
        }
    }

    fn handle_command(&mut self, command: LayoutCommand) {
        match command {
            LayoutCommand::Init {
                generation,
                nodes,
                links,
                dimensions,
                alpha,
            } => {
                tracing::debug!(generation, nodes = nodes.len(), links = links.len(), "layout init");
                self.generation = generation;
                self.engine = Some(ForceLayoutEngine::new(nodes, &links, dimensions, alpha));
                self.emit(LayoutEvent::Ready { generation });
            }
            LayoutCommand::Start => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.start();
                }
            }
            LayoutCommand::Stop => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.stop();
                }
            }
            LayoutCommand::Reheat { alpha } => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.reheat(alpha);
                }
            }
            LayoutCommand::Pin { node_id, position } => {
                if let Some(engine) = self.engine.as_mut()
                    && !engine.pin(&node_id, position)
                {
                    tracing::debug!(node_id, "pin ignored for unknown node");
                }
            }
            LayoutCommand::Update { nodes, links } => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.update(nodes.as_deref(), links.as_deref());
                }
            }
            LayoutCommand::Tick => {
                let started = Instant::now();
                if let Some(engine) = self.engine.as_mut() {
                    engine.tick();
                }
                self.emit_positions(started);
            }
            LayoutCommand::Shutdown => self.alive = false,
        }
    }

    fn run_batch(&mut self) {
        let started = Instant::now();
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if engine.run_batch(FRAME_BUDGET).is_some() {
            self.emit_positions(started);
        }
    }

    fn emit_positions(&mut self, started: Instant) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let event = LayoutEvent::Positions {
            generation: self.generation,
            nodes: engine.positions(),
            alpha: engine.state().alpha,
            tick_time: started.elapsed(),
        };
        self.emit(event);
    }

    fn emit(&mut self, event: LayoutEvent) {
        if self.event_tx.send(event).is_err() {
            self.alive = false;
            return;
        }
        if let Some(waker) = &self.waker {
            waker();
        }
    }
}
