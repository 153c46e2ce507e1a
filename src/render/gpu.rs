//! Accelerated scene: one instanced draw for every node sphere and one
//! `GL_LINES` draw for every connection.
//!
//! GL work happens inside an egui paint callback, after the UI pass that
//! scheduled it. The outcome of each paint is parked in [`PaintReport`] and
//! picked up by the component on the next frame, which is where render
//! failures turn into a switch to the vector fallback.

use std::f32::consts::{PI, TAU};
use std::mem::size_of;
use std::sync::Arc;

use eframe::egui::{self, mutex::Mutex};
use eframe::egui_glow;
use eframe::glow::{self, HasContext};
use glam::{Mat4, Vec3};

use crate::error::RenderError;

use super::connections::LineVertex;
use super::instances::NodeInstance;

const SPHERE_SEGMENTS: usize = 16;
const SPHERE_RINGS: usize = 10;
const MAX_DRAINED_ERRORS: usize = 16;

const SPHERE_VERTEX: &str = r#"
uniform mat4 u_view_proj;
in vec3 a_pos;
in vec3 i_offset;
in float i_radius;
in vec4 i_color;
out vec3 v_normal;
out vec4 v_color;
void main() {
    v_normal = a_pos;
    v_color = i_color;
    gl_Position = u_view_proj * vec4(i_offset + a_pos * i_radius, 1.0);
}
"#;

const SPHERE_FRAGMENT: &str = r#"
in vec3 v_normal;
in vec4 v_color;
out vec4 out_color;
void main() {
    vec3 light = normalize(vec3(0.4, 0.7, 0.6));
    float shade = 0.55 + 0.45 * max(dot(normalize(v_normal), light), 0.0);
    out_color = vec4(v_color.rgb * shade, v_color.a);
}
"#;

const LINE_VERTEX: &str = r#"
uniform mat4 u_view_proj;
in vec3 a_pos;
in vec4 a_color;
out vec4 v_color;
void main() {
    v_color = a_color;
    gl_Position = u_view_proj * vec4(a_pos, 1.0);
}
"#;

const LINE_FRAGMENT: &str = r#"
in vec4 v_color;
out vec4 out_color;
void main() {
    out_color = v_color;
}
"#;

/// Everything one paint needs. Buffers are re-uploaded only when their
/// revision differs from what the GPU already holds.
pub struct FramePacket {
    pub view_proj: Mat4,
    pub instances: Arc<[NodeInstance]>,
    pub instance_revision: u64,
    pub lines: Option<(Arc<[LineVertex]>, u64)>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PaintReport {
    pub painted_frames: u64,
    pub draw_calls: u32,
    pub error: Option<RenderError>,
}

#[derive(Default)]
pub struct GpuState {
    scene: Option<GpuScene>,
    report: PaintReport,
}

pub type SharedGpu = Arc<Mutex<GpuState>>;

impl GpuState {
    pub fn new(scene: GpuScene) -> Self {
        Self {
            scene: Some(scene),
            report: PaintReport::default(),
        }
    }

    /// Returns the report since the last call and clears its error.
    pub fn take_report(&mut self) -> PaintReport {
        let report = self.report.clone();
        self.report.error = None;
        report
    }

    /// Stands in for what the paint callback would have reported.
    #[cfg(test)]
    pub fn set_report(&mut self, painted_frames: u64, error: Option<RenderError>) {
        self.report.painted_frames = painted_frames;
        self.report.error = error;
    }

    pub fn destroy(&mut self, gl: &glow::Context) {
        if let Some(scene) = self.scene.take() {
            scene.destroy(gl);
        }
    }

    fn paint(&mut self, gl: &glow::Context, packet: &FramePacket) {
        if self.scene.is_none() {
            match GpuScene::new(gl) {
                Ok(scene) => {
                    tracing::info!("GPU scene rebuilt");
                    self.scene = Some(scene);
                }
                Err(error) => {
                    self.report.error = Some(error);
                    return;
                }
            }
        }
        let Some(scene) = self.scene.as_mut() else {
            return;
        };

        match scene.paint(gl, packet) {
            Ok(draw_calls) => {
                self.report.draw_calls = draw_calls;
                self.report.painted_frames += 1;
            }
            Err(RenderError::ContextLost) => {
                // Objects of a lost context are already gone; rebuild on restore.
                self.scene = None;
                self.report.error = Some(RenderError::ContextLost);
            }
            Err(error) => self.report.error = Some(error),
        }
    }
}

pub fn paint_callback(rect: egui::Rect, shared: SharedGpu, packet: FramePacket) -> egui::PaintCallback {
    egui::PaintCallback {
        rect,
        callback: Arc::new(egui_glow::CallbackFn::new(move |_info, painter| {
            shared.lock().paint(painter.gl(), &packet);
        })),
    }
}

pub struct GpuScene {
    sphere_program: glow::Program,
    line_program: glow::Program,
    sphere_view_proj: Option<glow::UniformLocation>,
    line_view_proj: Option<glow::UniformLocation>,
    sphere_vao: glow::VertexArray,
    line_vao: glow::VertexArray,
    sphere_vbo: glow::Buffer,
    instance_vbo: glow::Buffer,
    line_vbo: glow::Buffer,
    sphere_vertex_count: i32,
    instance_count: i32,
    line_vertex_count: i32,
    instance_revision: Option<u64>,
    line_revision: Option<u64>,
}

impl GpuScene {
    pub fn new(gl: &glow::Context) -> Result<Self, RenderError> {
        let shader_version = egui_glow::ShaderVersion::get(gl);
        if !shader_version.is_new_shader_interface() {
            return Err(RenderError::UnsupportedShaderVersion(format!("{shader_version:?}")));
        }
        let header = shader_version.version_declaration();

        // SAFETY: called on the thread owning `gl`, with the context current.
        unsafe {
            if drain_errors(gl) == Err(RenderError::ContextLost) {
                return Err(RenderError::ContextLost);
            }

            let sphere_program = link_program(
                gl,
                header,
                SPHERE_VERTEX,
                SPHERE_FRAGMENT,
                &["a_pos", "i_offset", "i_radius", "i_color"],
            )?;
            let line_program = link_program(gl, header, LINE_VERTEX, LINE_FRAGMENT, &["a_pos", "a_color"])?;

            let sphere_vao = gl.create_vertex_array().map_err(RenderError::Resource)?;
            let line_vao = gl.create_vertex_array().map_err(RenderError::Resource)?;
            let sphere_vbo = gl.create_buffer().map_err(RenderError::Resource)?;
            let instance_vbo = gl.create_buffer().map_err(RenderError::Resource)?;
            let line_vbo = gl.create_buffer().map_err(RenderError::Resource)?;

            let sphere = uv_sphere(SPHERE_SEGMENTS, SPHERE_RINGS);
            gl.bind_vertex_array(Some(sphere_vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(sphere_vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(&sphere), glow::STATIC_DRAW);
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, size_of::<[f32; 3]>() as i32, 0);

            let stride = size_of::<NodeInstance>() as i32;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(instance_vbo));
            for (location, components, offset) in [(1, 3, 0), (2, 1, 12), (3, 4, 16)] {
                gl.enable_vertex_attrib_array(location);
                gl.vertex_attrib_pointer_f32(location, components, glow::FLOAT, false, stride, offset);
                gl.vertex_attrib_divisor(location, 1);
            }

            let stride = size_of::<LineVertex>() as i32;
            gl.bind_vertex_array(Some(line_vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(line_vbo));
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 4, glow::FLOAT, false, stride, 12);

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            let scene = Self {
                sphere_view_proj: gl.get_uniform_location(sphere_program, "u_view_proj"),
                line_view_proj: gl.get_uniform_location(line_program, "u_view_proj"),
                sphere_program,
                line_program,
                sphere_vao,
                line_vao,
                sphere_vbo,
                instance_vbo,
                line_vbo,
                sphere_vertex_count: sphere.len() as i32,
                instance_count: 0,
                line_vertex_count: 0,
                instance_revision: None,
                line_revision: None,
            };

            if let Err(error) = drain_errors(gl) {
                scene.destroy(gl);
                return Err(error);
            }
            tracing::debug!(?shader_version, "GPU scene created");
            Ok(scene)
        }
    }

    /// Draws the scene and returns the number of draw calls issued.
    fn paint(&mut self, gl: &glow::Context, packet: &FramePacket) -> Result<u32, RenderError> {
        // SAFETY: runs inside egui's paint callback with the context current.
        unsafe {
            if drain_errors(gl) == Err(RenderError::ContextLost) {
                return Err(RenderError::ContextLost);
            }

            if self.instance_revision != Some(packet.instance_revision) {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.instance_vbo));
                gl.buffer_data_u8_slice(
                    glow::ARRAY_BUFFER,
                    bytemuck::cast_slice(&packet.instances[..]),
                    glow::DYNAMIC_DRAW,
                );
                self.instance_count = packet.instances.len() as i32;
                self.instance_revision = Some(packet.instance_revision);
            }
            if let Some((lines, revision)) = &packet.lines
                && self.line_revision != Some(*revision)
            {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.line_vbo));
                gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(&lines[..]), glow::DYNAMIC_DRAW);
                self.line_vertex_count = lines.len() as i32;
                self.line_revision = Some(*revision);
            }
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            let view_proj = packet.view_proj.to_cols_array();
            let mut draw_calls = 0;

            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LEQUAL);
            gl.depth_mask(true);
            gl.clear(glow::DEPTH_BUFFER_BIT);
            gl.enable(glow::BLEND);
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

            if self.instance_count > 0 {
                gl.use_program(Some(self.sphere_program));
                gl.uniform_matrix_4_f32_slice(self.sphere_view_proj.as_ref(), false, &view_proj);
                gl.bind_vertex_array(Some(self.sphere_vao));
                gl.draw_arrays_instanced(glow::TRIANGLES, 0, self.sphere_vertex_count, self.instance_count);
                draw_calls += 1;
            }

            if packet.lines.is_some() && self.line_vertex_count > 0 {
                gl.depth_mask(false);
                gl.use_program(Some(self.line_program));
                gl.uniform_matrix_4_f32_slice(self.line_view_proj.as_ref(), false, &view_proj);
                gl.bind_vertex_array(Some(self.line_vao));
                gl.draw_arrays(glow::LINES, 0, self.line_vertex_count);
                draw_calls += 1;
                gl.depth_mask(true);
            }

            gl.bind_vertex_array(None);
            gl.use_program(None);
            gl.disable(glow::DEPTH_TEST);

            drain_errors(gl)?;
            Ok(draw_calls)
        }
    }

    fn destroy(self, gl: &glow::Context) {
        // SAFETY: the handles were created on this context and are dropped here.
        unsafe {
            gl.delete_program(self.sphere_program);
            gl.delete_program(self.line_program);
            gl.delete_vertex_array(self.sphere_vao);
            gl.delete_vertex_array(self.line_vao);
            gl.delete_buffer(self.sphere_vbo);
            gl.delete_buffer(self.instance_vbo);
            gl.delete_buffer(self.line_vbo);
        }
    }
}

/// Clears the GL error queue, reporting context loss ahead of anything else.
unsafe fn drain_errors(gl: &glow::Context) -> Result<(), RenderError> {
    let mut first = None;
    for _ in 0..MAX_DRAINED_ERRORS {
        // SAFETY: forwarded from the caller.
        let code = unsafe { gl.get_error() };
        match code {
            glow::NO_ERROR => break,
            glow::CONTEXT_LOST => return Err(RenderError::ContextLost),
            code => {
                first.get_or_insert(code);
            }
        }
    }
    first.map_or(Ok(()), |code| Err(RenderError::Gl(code)))
}

/// Attribute `names` are bound to locations in slice order.
unsafe fn link_program(
    gl: &glow::Context,
    header: &str,
    vertex: &str,
    fragment: &str,
    names: &[&str],
) -> Result<glow::Program, RenderError> {
    // SAFETY: forwarded from the caller.
    unsafe {
        let program = gl.create_program().map_err(RenderError::Resource)?;
        let mut shaders = Vec::with_capacity(2);
        for (stage, kind, body) in [
            ("vertex", glow::VERTEX_SHADER, vertex),
            ("fragment", glow::FRAGMENT_SHADER, fragment),
        ] {
            let shader = gl.create_shader(kind).map_err(RenderError::Resource)?;
            let source = format!("{header}\n#ifdef GL_ES\nprecision mediump float;\n#endif\n{body}");
            gl.shader_source(shader, &source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                gl.delete_program(program);
                return Err(RenderError::ShaderCompile { stage, log });
            }
            gl.attach_shader(program, shader);
            shaders.push(shader);
        }

        for (location, name) in names.iter().enumerate() {
            gl.bind_attrib_location(program, location as u32, name);
        }
        gl.link_program(program);

        for shader in shaders {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }
        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(RenderError::ProgramLink(log));
        }
        Ok(program)
    }
}

/// Unit sphere as a flat triangle list; positions double as normals.
fn uv_sphere(segments: usize, rings: usize) -> Vec<[f32; 3]> {
    let point = |ring: usize, segment: usize| {
        let theta = PI * ring as f32 / rings as f32;
        let phi = TAU * segment as f32 / segments as f32;
        Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()).to_array()
    };

    let mut vertices = Vec::with_capacity(segments * rings * 6);
    for ring in 0..rings {
        for segment in 0..segments {
            let a = point(ring, segment);
            let b = point(ring + 1, segment);
            let c = point(ring + 1, segment + 1);
            let d = point(ring, segment + 1);
            vertices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }
    vertices
}
