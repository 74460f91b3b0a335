use std::borrow::Cow;

use wgpu::naga;
use wgpu::naga::ShaderStage;

use crate::error::{CompileError, StageKind};
use crate::reflect::{check_interface, resolve_bindings, UniformBindings, UniformName};

/// Descriptor set and binding of the shared uniform block.
pub const UNIFORM_GROUP: u32 = 0;
pub const UNIFORM_BINDING: u32 = 0;

macro_rules! uniform_block {
    () => {
        r"layout(std140, set = 0, binding = 0) uniform SandboxUniforms {
    mat4 projection;
    vec2 uResolution;
    vec2 uMouse;
    float uTime;
};
"
    };
}

/// Fixed vertex stage: projects the pixel-space quad and forwards the
/// per-vertex color plus the bottom-left-origin pixel coordinate.
pub const VERTEX_SHADER_GLSL: &str = concat!(
    "#version 450\n",
    "layout(location = 0) in vec3 aPos;\n",
    "layout(location = 1) in vec3 aCol;\n",
    "layout(location = 0) out vec3 Col;\n",
    "layout(location = 1) out vec2 sandbox_pixel;\n",
    uniform_block!(),
    r"
void main() {
    gl_Position = projection * vec4(aPos, 1.0);
    Col = aCol;
    sandbox_pixel = aPos.xy;
}
"
);

/// GLSL prologue injected ahead of every user fragment shader.
///
/// `gl_FragCoord` is aliased to a private global so user code sees a
/// bottom-left origin, the same convention as the mouse uniform.
const HEADER: &str = concat!(
    "#version 450\n",
    uniform_block!(),
    r"layout(location = 1) in vec2 sandbox_pixel;

vec4 sandbox_FragCoord;
#define gl_FragCoord sandbox_FragCoord
#define main sandbox_user_main
"
);

/// GLSL epilogue that fills the `gl_FragCoord` alias and calls the user's `main`.
const FOOTER: &str = r"
#undef main
void main() {
    #undef gl_FragCoord
    vec4 builtin_frag_coord = gl_FragCoord;
    #define gl_FragCoord sandbox_FragCoord

    sandbox_FragCoord = vec4(sandbox_pixel, builtin_frag_coord.z, builtin_frag_coord.w);
    sandbox_user_main();
}
";

/// Fragment program loaded at startup: a ray-marched sphere lit by an orbiting
/// light over a vertical gradient.
pub const DEFAULT_FRAGMENT_SHADER: &str = r"#version 300 es
precision highp float;

layout(location = 0) out vec4 fragColor;

layout(location = 0) in vec3 Col;

uniform float uTime;
uniform vec2 uResolution;
uniform vec2 uMouse;

float sphere(vec3 p, float radius) {
    return length(p) - radius;
}

float scene(vec3 p) {
    return sphere(p, 1.0);
}

float trace(vec3 origin, vec3 dir) {
    float t = 0.0;
    for (int i = 0; i < 100; i++) {
        float d = scene(origin + t * dir);
        if (d < 0.001) {
            return t;
        }
        t += d;
        if (t > 100.0) {
            break;
        }
    }
    return -1.0;
}

vec3 normal_at(vec3 p) {
    float e = 0.001;
    float dx = scene(p + vec3(e, 0.0, 0.0)) - scene(p - vec3(e, 0.0, 0.0));
    float dy = scene(p + vec3(0.0, e, 0.0)) - scene(p - vec3(0.0, e, 0.0));
    float dz = scene(p + vec3(0.0, 0.0, e)) - scene(p - vec3(0.0, 0.0, e));
    return normalize(vec3(dx, dy, dz));
}

void main() {
    float aspect = uResolution.x / uResolution.y;
    vec2 st = gl_FragCoord.xy / uResolution;
    vec2 mouse = uMouse / uResolution;

    vec2 uv = st * 2.0 - 1.0;
    uv.x *= aspect;

    vec3 origin = vec3(0.0, 0.0, 3.0);
    vec3 dir = vec3(uv, -1.0);
    vec3 light = vec3(2.0 * sin(uTime), 2.0 + mouse.y, 2.0 * cos(uTime));

    float t = trace(origin, dir);
    if (t > 0.0) {
        vec3 p = origin + t * dir;
        vec3 n = normal_at(p);
        vec3 l = normalize(light - p);
        vec3 v = normalize(origin - p);
        vec3 r = reflect(-l, n);

        float diffuse = max(dot(l, n), 0.0);
        float specular = pow(max(dot(r, v), 0.0), 32.0);
        float phong = 0.1 + diffuse + specular;

        fragColor = vec4(vec3(1.0, 0.4, 0.0) * phong, 1.0);
    } else {
        vec3 low = vec3(0.0, 0.0, 0.3);
        vec3 high = vec3(0.2, 0.2, 0.5);
        fragColor = vec4(mix(low, high, st.y), 1.0);
    }
}
";

/// Both stages of a program after they compiled, validated and passed the
/// interface check, together with the uniforms they reference.
#[derive(Debug)]
pub struct CompiledStages {
    pub vertex_source: &'static str,
    pub fragment_source: String,
    pub vertex: naga::Module,
    pub fragment: naga::Module,
    pub bindings: UniformBindings,
}

impl CompiledStages {
    pub fn fragment_glsl(&self) -> wgpu::ShaderSource<'_> {
        wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(self.fragment_source.as_str()),
            stage: ShaderStage::Fragment,
            defines: &[],
        }
    }
}

/// Compiles the fixed vertex stage and the given fragment source, then checks
/// that the two fit together and reflects the sandbox uniforms they use.
pub fn compile_stages(fragment_source: &str) -> Result<CompiledStages, CompileError> {
    let wrapped = wrap_fragment(fragment_source);
    let vertex = compile_stage(StageKind::Vertex, VERTEX_SHADER_GLSL)?;
    let fragment = compile_stage(StageKind::Fragment, &wrapped)?;

    check_interface(&vertex, &fragment)
        .map_err(|diagnostics| CompileError::Link { diagnostics })?;
    let bindings = resolve_bindings(&[&vertex, &fragment]);

    Ok(CompiledStages {
        vertex_source: VERTEX_SHADER_GLSL,
        fragment_source: wrapped,
        vertex,
        fragment,
        bindings,
    })
}

/// Parses and validates one stage with naga, returning the compiler's
/// rendered diagnostics on failure.
pub fn compile_stage(stage: StageKind, source: &str) -> Result<naga::Module, CompileError> {
    let naga_stage = match stage {
        StageKind::Vertex => ShaderStage::Vertex,
        StageKind::Fragment => ShaderStage::Fragment,
    };
    let mut frontend = naga::front::glsl::Frontend::default();
    let module = frontend
        .parse(&naga::front::glsl::Options::from(naga_stage), source)
        .map_err(|errors| CompileError::Stage {
            stage,
            diagnostics: errors.emit_to_string(source),
        })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|error| CompileError::Stage {
        stage,
        diagnostics: error.emit_to_string(source),
    })?;

    Ok(module)
}

/// Produces a Vulkan GLSL fragment shader from WebGL-style source.
///
/// Steps performed:
///
/// 1. Blank out the first `#version` directive, `precision` statements and
///    loose declarations of the sandbox uniforms. Lines are kept so user line
///    numbers stay at a fixed offset from the prologue.
/// 2. Prepend [`HEADER`] which declares the uniform block and the
///    `gl_FragCoord` alias, and renames the user's `main`.
/// 3. Append [`FOOTER`] which fills the alias and calls the user's `main`.
pub fn wrap_fragment(source: &str) -> String {
    let mut body = String::with_capacity(source.len() + 1);
    let mut skipped_version = false;
    for line in source.lines() {
        let trimmed = line.trim_start();
        let skip = if !skipped_version && trimmed.starts_with("#version") {
            skipped_version = true;
            true
        } else {
            trimmed.starts_with("precision ") || declares_sandbox_uniform(trimmed)
        };
        if !skip {
            body.push_str(line);
        }
        body.push('\n');
    }

    format!("{HEADER}{body}{FOOTER}")
}

/// Number of lines the prologue adds in front of user code.
pub fn header_line_count() -> usize {
    HEADER.lines().count()
}

fn declares_sandbox_uniform(trimmed: &str) -> bool {
    let Some(rest) = trimmed.strip_prefix("uniform ") else {
        return false;
    };
    let declaration = rest.split(';').next().unwrap_or(rest);
    declaration
        .split_whitespace()
        .last()
        .is_some_and(|name| UniformName::from_glsl(name).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_strips_sandbox_uniforms_and_directives() {
        let source = r"#version 300 es
precision highp float;
uniform float uTime;
uniform highp vec2 uResolution; // pixels
uniform vec4 uTint;
out vec4 fragColor;
void main() { fragColor = vec4(uTime); }
";
        let wrapped = wrap_fragment(source);
        assert!(!wrapped.contains("#version 300 es"));
        assert!(!wrapped.contains("precision highp"));
        assert!(!wrapped.contains("uniform float uTime"));
        assert!(!wrapped.contains("uniform highp vec2 uResolution"));
        assert!(wrapped.contains("uniform vec4 uTint;"));
        assert!(wrapped.contains("sandbox_user_main"));
        assert!(wrapped.starts_with("#version 450"));
    }

    #[test]
    fn wrap_keeps_user_line_numbers_at_fixed_offset() {
        let source = "#version 300 es\nprecision highp float;\nvoid main() {}\n";
        let wrapped = wrap_fragment(source);
        let line = wrapped
            .lines()
            .position(|line| line == "void main() {}")
            .expect("user main present");
        assert_eq!(line, header_line_count() + 2);
    }

    #[test]
    fn default_program_compiles() {
        let stages = compile_stages(DEFAULT_FRAGMENT_SHADER).expect("default shader compiles");
        for name in UniformName::ALL {
            assert!(
                stages.bindings.get(name).is_some(),
                "{name} should be resolved"
            );
        }
    }

    #[test]
    fn undeclared_identifier_is_a_fragment_stage_error() {
        let source = r"#version 300 es
precision highp float;
out vec4 fragColor;
void main() {
    fragColor = vec4(undeclared_value, 0.0, 0.0, 1.0);
}
";
        let err = compile_stages(source).unwrap_err();
        match &err {
            CompileError::Stage { stage, diagnostics } => {
                assert_eq!(*stage, StageKind::Fragment);
                assert!(!diagnostics.is_empty());
            }
            other => panic!("expected stage error, got {other:?}"),
        }
    }

    #[test]
    fn vertex_stage_compiles_on_its_own() {
        compile_stage(StageKind::Vertex, VERTEX_SHADER_GLSL).expect("vertex stage");
    }
}
