//! OpenGL 3.3 renderer on top of `glow`.
//!
//! Draws in two passes: a depth-only pass from the sun into a shadow map,
//! then the lit pass into an offscreen target sized by the viewport's pixel
//! ratio, which is finally blitted onto the window surface.

use glam::Mat4;
use glow::HasContext;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

use super::{
    mesh::{Material, MeshData, MeshId, MeshLibrary},
    shaders::{self, ShaderProgram},
    viewport::Viewport,
    Frame, Renderer,
};
use crate::utils::error::RenderError;

const FLOATS_PER_VERTEX: i32 = 6;
const VERTEX_STRIDE: i32 = FLOATS_PER_VERTEX * std::mem::size_of::<f32>() as i32;
const SHADOW_TEXTURE_UNIT: u32 = 0;

struct GpuMesh {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    ebo: glow::Buffer,
    index_count: i32,
}

struct ShadowTarget {
    framebuffer: glow::Framebuffer,
    depth: glow::Texture,
    size: u32,
}

struct ColorTarget {
    framebuffer: glow::Framebuffer,
    color: glow::Renderbuffer,
    depth: glow::Renderbuffer,
    size: (u32, u32),
}

struct DrawItem {
    mesh: MeshId,
    material: Material,
    world: Mat4,
    cast_shadow: bool,
    receive_shadow: bool,
}

pub struct GlRenderer {
    gl: Arc<glow::Context>,
    lit: ShaderProgram,
    depth_only: ShaderProgram,
    meshes: HashMap<MeshId, GpuMesh>,
    shadow: Option<ShadowTarget>,
    target: Option<ColorTarget>,
    viewport: Viewport,
    surface_size: (u32, u32),
}

impl GlRenderer {
    pub fn new(gl: Arc<glow::Context>, viewport: Viewport) -> Result<Self, RenderError> {
        let lit = ShaderProgram::new(&gl, shaders::lit::VERTEX_SRC, shaders::lit::FRAGMENT_SRC)?;
        let depth_only = match ShaderProgram::new(
            &gl,
            shaders::shadow::VERTEX_SRC,
            shaders::shadow::FRAGMENT_SRC,
        ) {
            Ok(program) => program,
            Err(e) => {
                lit.delete(&gl);
                return Err(e);
            }
        };

        unsafe {
            let version = gl.get_parameter_string(glow::VERSION);
            info!("OpenGL {}", version);
        }

        Ok(Self {
            gl,
            lit,
            depth_only,
            meshes: HashMap::new(),
            shadow: None,
            target: None,
            surface_size: viewport.physical_size(),
            viewport,
        })
    }

    pub fn gl(&self) -> &Arc<glow::Context> {
        &self.gl
    }

    /// Size of the window's default framebuffer in device pixels.
    pub fn set_surface_size(&mut self, width: u32, height: u32) {
        self.surface_size = (width, height);
    }

    pub fn uploaded_meshes(&self) -> usize {
        self.meshes.len()
    }

    fn upload(&mut self, id: MeshId, data: &MeshData) -> Result<(), RenderError> {
        if self.meshes.contains_key(&id) {
            return Ok(());
        }
        let gl = &self.gl;
        let vertices = data.interleaved();
        unsafe {
            let vao = gl.create_vertex_array().map_err(RenderError::Resource)?;
            let vbo = gl.create_buffer().map_err(RenderError::Resource)?;
            let ebo = gl.create_buffer().map_err(RenderError::Resource)?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&vertices),
                glow::STATIC_DRAW,
            );
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&data.indices),
                glow::STATIC_DRAW,
            );

            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, VERTEX_STRIDE, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(
                1,
                3,
                glow::FLOAT,
                false,
                VERTEX_STRIDE,
                3 * std::mem::size_of::<f32>() as i32,
            );
            gl.bind_vertex_array(None);

            self.meshes.insert(
                id,
                GpuMesh {
                    vao,
                    vbo,
                    ebo,
                    index_count: data.indices.len() as i32,
                },
            );
        }
        debug!("Uploaded mesh {:?} ({} triangles)", id, data.triangle_count());
        Ok(())
    }

    fn ensure_shadow_target(&mut self, size: u32) -> Result<(), RenderError> {
        if self.shadow.as_ref().map(|s| s.size) == Some(size) {
            return Ok(());
        }
        if let Some(old) = self.shadow.take() {
            unsafe {
                self.gl.delete_framebuffer(old.framebuffer);
                self.gl.delete_texture(old.depth);
            }
        }

        let gl = &self.gl;
        unsafe {
            let depth = gl.create_texture().map_err(RenderError::Resource)?;
            gl.bind_texture(glow::TEXTURE_2D, Some(depth));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::DEPTH_COMPONENT24 as i32,
                size as i32,
                size as i32,
                0,
                glow::DEPTH_COMPONENT,
                glow::FLOAT,
                None,
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
            for wrap in [glow::TEXTURE_WRAP_S, glow::TEXTURE_WRAP_T] {
                gl.tex_parameter_i32(glow::TEXTURE_2D, wrap, glow::CLAMP_TO_BORDER as i32);
            }
            gl.tex_parameter_f32_slice(glow::TEXTURE_2D, glow::TEXTURE_BORDER_COLOR, &[1.0; 4]);

            let framebuffer = gl.create_framebuffer().map_err(RenderError::Resource)?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::TEXTURE_2D,
                Some(depth),
                0,
            );
            gl.draw_buffer(glow::NONE);
            gl.read_buffer(glow::NONE);
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.bind_texture(glow::TEXTURE_2D, None);

            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_framebuffer(framebuffer);
                gl.delete_texture(depth);
                return Err(RenderError::IncompleteFramebuffer(status));
            }
            self.shadow = Some(ShadowTarget {
                framebuffer,
                depth,
                size,
            });
        }
        Ok(())
    }

    fn ensure_color_target(&mut self, size: (u32, u32)) -> Result<(), RenderError> {
        if self.target.as_ref().map(|t| t.size) == Some(size) {
            return Ok(());
        }
        if let Some(old) = self.target.take() {
            unsafe {
                self.gl.delete_framebuffer(old.framebuffer);
                self.gl.delete_renderbuffer(old.color);
                self.gl.delete_renderbuffer(old.depth);
            }
        }

        let gl = &self.gl;
        let (w, h) = (size.0 as i32, size.1 as i32);
        unsafe {
            let color = gl.create_renderbuffer().map_err(RenderError::Resource)?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(color));
            gl.renderbuffer_storage(glow::RENDERBUFFER, glow::RGBA8, w, h);

            let depth = gl.create_renderbuffer().map_err(RenderError::Resource)?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
            gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH_COMPONENT24, w, h);
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);

            let framebuffer = gl.create_framebuffer().map_err(RenderError::Resource)?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::RENDERBUFFER,
                Some(color),
            );
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(depth),
            );
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_framebuffer(framebuffer);
                gl.delete_renderbuffer(color);
                gl.delete_renderbuffer(depth);
                return Err(RenderError::IncompleteFramebuffer(status));
            }
            self.target = Some(ColorTarget {
                framebuffer,
                color,
                depth,
                size,
            });
        }
        debug!("Render target resized to {}x{}", size.0, size.1);
        Ok(())
    }

    fn collect(frame: &Frame<'_>) -> Vec<DrawItem> {
        let mut draws = Vec::new();
        frame.scene.visit_visible(|node, world| {
            let Some(mesh) = node.mesh else {
                return;
            };
            let material = node
                .material
                .and_then(|id| frame.library.material(id))
                .cloned()
                .unwrap_or_default();
            draws.push(DrawItem {
                mesh,
                material,
                world,
                cast_shadow: node.cast_shadow,
                receive_shadow: node.receive_shadow,
            });
        });
        draws
    }

    fn draw_mesh(&self, id: MeshId) {
        if let Some(mesh) = self.meshes.get(&id) {
            unsafe {
                self.gl.bind_vertex_array(Some(mesh.vao));
                self.gl
                    .draw_elements(glow::TRIANGLES, mesh.index_count, glow::UNSIGNED_INT, 0);
            }
        }
    }

    fn shadow_pass(&mut self, draws: &[DrawItem], light_space: &Mat4) {
        let Some((framebuffer, size)) = self.shadow.as_ref().map(|s| (s.framebuffer, s.size)) else {
            return;
        };
        let gl = Arc::clone(&self.gl);
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.viewport(0, 0, size as i32, size as i32);
            gl.clear(glow::DEPTH_BUFFER_BIT);
        }
        self.depth_only.bind(&gl);
        self.depth_only.set_mat4(&gl, "u_light_space", light_space);
        for draw in draws.iter().filter(|d| d.cast_shadow && !d.material.wireframe) {
            self.depth_only.set_mat4(&gl, "u_model", &draw.world);
            self.draw_mesh(draw.mesh);
        }
    }

    fn lit_pass(&mut self, frame: &Frame<'_>, draws: &[DrawItem], light_space: &Mat4) {
        let Some((framebuffer, (w, h))) = self.target.as_ref().map(|t| (t.framebuffer, t.size))
        else {
            return;
        };
        let gl = Arc::clone(&self.gl);
        let [r, g, b] = frame.clear_color;
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.viewport(0, 0, w as i32, h as i32);
            gl.clear_color(r, g, b, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            gl.active_texture(glow::TEXTURE0 + SHADOW_TEXTURE_UNIT);
            gl.bind_texture(glow::TEXTURE_2D, self.shadow.as_ref().map(|s| s.depth));
        }

        let lighting = frame.lighting;
        let ambient = lighting.ambient.color.map(|c| c * lighting.ambient.intensity);
        let sun = lighting.sun.color.map(|c| c * lighting.sun.intensity);

        self.lit.bind(&gl);
        self.lit.set_mat4(&gl, "u_view_projection", &frame.camera.view_projection());
        self.lit.set_mat4(&gl, "u_light_space", light_space);
        self.lit.set_vec3(&gl, "u_ambient", ambient);
        self.lit.set_vec3(&gl, "u_sun_color", sun);
        self.lit.set_vec3(&gl, "u_sun_direction", lighting.sun.direction().to_array());
        self.lit.set_vec3(&gl, "u_camera_position", frame.camera.position.to_array());
        self.lit.set_i32(&gl, "u_shadow_map", SHADOW_TEXTURE_UNIT as i32);

        let (transparent, opaque): (Vec<&DrawItem>, Vec<&DrawItem>) = draws
            .iter()
            .filter(|d| d.material.opacity > 0.0)
            .partition(|d| d.material.opacity < 1.0);

        for draw in opaque {
            self.draw_lit(&gl, draw, lighting.sun.cast_shadow);
        }
        if !transparent.is_empty() {
            unsafe {
                gl.enable(glow::BLEND);
                gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
                gl.depth_mask(false);
            }
            for draw in transparent {
                self.draw_lit(&gl, draw, lighting.sun.cast_shadow);
            }
            unsafe {
                gl.depth_mask(true);
                gl.disable(glow::BLEND);
            }
        }
    }

    fn draw_lit(&mut self, gl: &glow::Context, draw: &DrawItem, shadows: bool) {
        let material = &draw.material;
        self.lit.set_mat4(gl, "u_model", &draw.world);
        self.lit.set_vec3(gl, "u_color", material.color);
        self.lit.set_f32(gl, "u_opacity", material.opacity);
        self.lit.set_f32(gl, "u_roughness", material.roughness);
        self.lit.set_f32(gl, "u_metalness", material.metalness);
        self.lit.set_i32(gl, "u_unlit", material.wireframe as i32);
        self.lit
            .set_i32(gl, "u_receive_shadow", (shadows && draw.receive_shadow) as i32);

        if material.wireframe {
            unsafe { gl.polygon_mode(glow::FRONT_AND_BACK, glow::LINE) };
            self.draw_mesh(draw.mesh);
            unsafe { gl.polygon_mode(glow::FRONT_AND_BACK, glow::FILL) };
        } else {
            self.draw_mesh(draw.mesh);
        }
    }

    fn present(&self) {
        let Some(target) = self.target.as_ref() else {
            return;
        };
        let (sw, sh) = self.surface_size;
        unsafe {
            self.gl
                .bind_framebuffer(glow::READ_FRAMEBUFFER, Some(target.framebuffer));
            self.gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
            self.gl.blit_framebuffer(
                0,
                0,
                target.size.0 as i32,
                target.size.1 as i32,
                0,
                0,
                sw as i32,
                sh as i32,
                glow::COLOR_BUFFER_BIT,
                glow::LINEAR,
            );
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.gl.bind_vertex_array(None);
            self.gl.viewport(0, 0, sw as i32, sh as i32);
        }
    }

    /// Frees every GL object. Must run while the context is still current.
    pub fn destroy(&mut self) {
        let gl = &self.gl;
        unsafe {
            for (_, mesh) in self.meshes.drain() {
                gl.delete_vertex_array(mesh.vao);
                gl.delete_buffer(mesh.vbo);
                gl.delete_buffer(mesh.ebo);
            }
            if let Some(shadow) = self.shadow.take() {
                gl.delete_framebuffer(shadow.framebuffer);
                gl.delete_texture(shadow.depth);
            }
            if let Some(target) = self.target.take() {
                gl.delete_framebuffer(target.framebuffer);
                gl.delete_renderbuffer(target.color);
                gl.delete_renderbuffer(target.depth);
            }
        }
        self.lit.delete(gl);
        self.depth_only.delete(gl);
    }
}

impl Renderer for GlRenderer {
    fn set_viewport(&mut self, viewport: &Viewport) {
        self.viewport = *viewport;
    }

    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        if self.viewport.is_empty() || self.surface_size.0 == 0 || self.surface_size.1 == 0 {
            return Ok(());
        }

        let draws = Self::collect(frame);
        for draw in &draws {
            if let Some(data) = frame.library.mesh(draw.mesh) {
                self.upload(draw.mesh, data)?;
            }
        }

        let sun = &frame.lighting.sun;
        if sun.cast_shadow {
            self.ensure_shadow_target(sun.shadow.map_size.max(1))?;
        }
        self.ensure_color_target(self.viewport.physical_size())?;

        unsafe {
            self.gl.enable(glow::DEPTH_TEST);
            self.gl.depth_func(glow::LESS);
            self.gl.disable(glow::CULL_FACE);
        }

        let light_space = sun.light_space_matrix();
        if sun.cast_shadow {
            self.shadow_pass(&draws, &light_space);
        }
        self.lit_pass(frame, &draws, &light_space);
        self.present();
        Ok(())
    }
}
