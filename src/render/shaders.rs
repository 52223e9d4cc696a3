use glam::Mat4;
use glow::HasContext;
use std::collections::HashMap;

use crate::utils::error::RenderError;

/// Linked GL program with a cache of uniform locations.
pub struct ShaderProgram {
    program: glow::Program,
    uniforms: HashMap<&'static str, Option<glow::UniformLocation>>,
}

impl ShaderProgram {
    pub fn new(
        gl: &glow::Context,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self, RenderError> {
        unsafe {
            let program = gl.create_program().map_err(RenderError::Resource)?;

            let mut shaders = Vec::with_capacity(2);
            for (kind, source) in [
                (glow::VERTEX_SHADER, vertex_src),
                (glow::FRAGMENT_SHADER, fragment_src),
            ] {
                let shader = gl.create_shader(kind).map_err(RenderError::Resource)?;
                gl.shader_source(shader, source);
                gl.compile_shader(shader);
                if !gl.get_shader_compile_status(shader) {
                    let log = gl.get_shader_info_log(shader);
                    gl.delete_shader(shader);
                    for (_, attached) in &shaders {
                        gl.delete_shader(*attached);
                    }
                    gl.delete_program(program);
                    return Err(RenderError::Compilation(log));
                }
                gl.attach_shader(program, shader);
                shaders.push((kind, shader));
            }

            gl.link_program(program);
            let linked = gl.get_program_link_status(program);
            for (_, shader) in shaders {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }
            if !linked {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(RenderError::Linking(log));
            }

            Ok(Self {
                program,
                uniforms: HashMap::new(),
            })
        }
    }

    pub fn bind(&self, gl: &glow::Context) {
        unsafe { gl.use_program(Some(self.program)) };
    }

    fn location(
        &mut self,
        gl: &glow::Context,
        name: &'static str,
    ) -> Option<glow::UniformLocation> {
        let program = self.program;
        self.uniforms
            .entry(name)
            .or_insert_with(|| unsafe { gl.get_uniform_location(program, name) })
            .clone()
    }

    pub fn set_mat4(&mut self, gl: &glow::Context, name: &'static str, value: &Mat4) {
        let location = self.location(gl, name);
        unsafe { gl.uniform_matrix_4_f32_slice(location.as_ref(), false, &value.to_cols_array()) };
    }

    pub fn set_vec3(&mut self, gl: &glow::Context, name: &'static str, value: [f32; 3]) {
        let location = self.location(gl, name);
        unsafe { gl.uniform_3_f32(location.as_ref(), value[0], value[1], value[2]) };
    }

    pub fn set_f32(&mut self, gl: &glow::Context, name: &'static str, value: f32) {
        let location = self.location(gl, name);
        unsafe { gl.uniform_1_f32(location.as_ref(), value) };
    }

    pub fn set_i32(&mut self, gl: &glow::Context, name: &'static str, value: i32) {
        let location = self.location(gl, name);
        unsafe { gl.uniform_1_i32(location.as_ref(), value) };
    }

    pub fn delete(&self, gl: &glow::Context) {
        unsafe { gl.delete_program(self.program) };
    }
}

/// Depth-only pass from the directional light.
pub mod shadow {
    pub const VERTEX_SRC: &str = r#"#version 330 core
layout (location = 0) in vec3 a_position;

uniform mat4 u_light_space;
uniform mat4 u_model;

void main() {
    gl_Position = u_light_space * u_model * vec4(a_position, 1.0);
}
"#;

    pub const FRAGMENT_SRC: &str = r#"#version 330 core
void main() {}
"#;
}

/// Ambient + one directional light with a 3x3 PCF shadow lookup.
pub mod lit {
    pub const VERTEX_SRC: &str = r#"#version 330 core
layout (location = 0) in vec3 a_position;
layout (location = 1) in vec3 a_normal;

uniform mat4 u_model;
uniform mat4 u_view_projection;
uniform mat4 u_light_space;

out vec3 v_world;
out vec3 v_normal;
out vec4 v_light_space;

void main() {
    vec4 world = u_model * vec4(a_position, 1.0);
    v_world = world.xyz;
    v_normal = mat3(transpose(inverse(u_model))) * a_normal;
    v_light_space = u_light_space * world;
    gl_Position = u_view_projection * world;
}
"#;

    pub const FRAGMENT_SRC: &str = r#"#version 330 core
in vec3 v_world;
in vec3 v_normal;
in vec4 v_light_space;

out vec4 frag_color;

uniform vec3 u_color;
uniform float u_opacity;
uniform float u_roughness;
uniform float u_metalness;
uniform int u_unlit;
uniform int u_receive_shadow;

uniform vec3 u_ambient;
uniform vec3 u_sun_color;
uniform vec3 u_sun_direction;
uniform vec3 u_camera_position;
uniform sampler2D u_shadow_map;

float lit_fraction(vec3 normal) {
    vec3 p = v_light_space.xyz / v_light_space.w * 0.5 + 0.5;
    if (p.z > 1.0 || p.x < 0.0 || p.x > 1.0 || p.y < 0.0 || p.y > 1.0) {
        return 1.0;
    }
    float bias = max(0.004 * (1.0 - dot(normal, u_sun_direction)), 0.0008);
    vec2 texel = 1.0 / vec2(textureSize(u_shadow_map, 0));
    float lit = 0.0;
    for (int x = -1; x <= 1; ++x) {
        for (int y = -1; y <= 1; ++y) {
            float closest = texture(u_shadow_map, p.xy + vec2(x, y) * texel).r;
            lit += (p.z - bias > closest) ? 0.0 : 1.0;
        }
    }
    return lit / 9.0;
}

void main() {
    if (u_unlit != 0) {
        frag_color = vec4(u_color, u_opacity);
        return;
    }

    vec3 normal = normalize(v_normal);
    if (!gl_FrontFacing) {
        normal = -normal;
    }

    float diffuse = max(dot(normal, u_sun_direction), 0.0);
    vec3 view_dir = normalize(u_camera_position - v_world);
    vec3 half_dir = normalize(view_dir + u_sun_direction);
    float shininess = mix(64.0, 2.0, u_roughness);
    float specular = pow(max(dot(normal, half_dir), 0.0), shininess) * (1.0 - u_roughness) * 0.5;

    float shadow = (u_receive_shadow != 0) ? lit_fraction(normal) : 1.0;
    vec3 albedo = u_color * (1.0 - 0.5 * u_metalness);
    vec3 color = albedo * u_ambient + (albedo * diffuse + vec3(specular)) * u_sun_color * shadow;
    frag_color = vec4(color, u_opacity);
}
"#;
}
