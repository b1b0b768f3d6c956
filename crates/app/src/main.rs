//! Demo binary: import a model file, assemble it into the headless render
//! engine, register a camera and a point light, and draw one frame.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use corelib::{camera::Camera, light::PointLight, transform::Transform, vec3};
use renderer::RenderEngine;
use renderer::assembler::assemble_model;
use renderer::headless::HeadlessRenderer;

const BASIC_VERT: &str = include_str!("shaders/basic.vert");
const BASIC_FRAG: &str = include_str!("shaders/basic.frag");

/// Embedded shader catalog; `--shader=NAME` picks a pair by name.
fn shader_sources(name: &str) -> Option<(&'static str, &'static str)> {
    match name {
        "basic" => Some((BASIC_VERT, BASIC_FRAG)),
        _ => None,
    }
}

fn parse_model_arg() -> Option<PathBuf> {
    for arg in std::env::args() {
        if let Some(val) = arg.strip_prefix("--model=") {
            return Some(PathBuf::from(val));
        }
    }
    None
}

fn parse_flip_textures_arg() -> bool {
    // Flipping on load matches GL-style UV origins; opt out with
    // --no-flip-textures.
    !std::env::args().any(|arg| arg == "--no-flip-textures")
}

fn parse_scale_arg() -> f32 {
    for arg in std::env::args() {
        if let Some(val) = arg.strip_prefix("--scale=") {
            if let Ok(scale) = val.parse::<f32>() {
                return scale;
            }
            eprintln!("[warn] Invalid --scale value '{val}', using 1.0.");
        }
    }
    1.0
}

fn parse_shader_arg() -> String {
    for arg in std::env::args() {
        if let Some(val) = arg.strip_prefix("--shader=") {
            return val.to_string();
        }
    }
    "basic".to_string()
}

fn parse_translate_arg() -> corelib::Vec3 {
    for arg in std::env::args() {
        if let Some(val) = arg.strip_prefix("--translate=") {
            let parts: Vec<_> = val.split(',').collect();
            if let [x, y, z] = parts.as_slice() {
                if let (Ok(x), Ok(y), Ok(z)) =
                    (x.parse::<f32>(), y.parse::<f32>(), z.parse::<f32>())
                {
                    return vec3(x, y, z);
                }
            }
            eprintln!("[warn] Invalid --translate value '{val}', using 0,0,0.");
        }
    }
    corelib::Vec3::ZERO
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(model_path) = parse_model_arg() else {
        bail!(
            "usage: app --model=PATH [--shader=NAME] [--scale=S] [--translate=X,Y,Z] [--no-flip-textures]"
        );
    };
    let flip = parse_flip_textures_arg();
    let scale = parse_scale_arg();
    let translation = parse_translate_arg();
    let shader_name = parse_shader_arg();
    let Some((vertex_src, fragment_src)) = shader_sources(&shader_name) else {
        bail!("unknown shader '{shader_name}' (available: basic)");
    };

    log::info!(
        "Importing {} (shader={}, flip_textures={}, scale={}, translate={})",
        model_path.display(),
        shader_name,
        flip,
        scale,
        translation
    );

    // Process-wide decode setting; must happen before the first decode.
    asset::texture::init_decoder(flip);

    let model = asset::load_model(&model_path)
        .with_context(|| format!("import of {} failed", model_path.display()))?;

    let mut engine = HeadlessRenderer::new();
    let shader = engine
        .load_shader(vertex_src, fragment_src)
        .context("shader registration failed")?;

    let placement = Transform::from_translation_scale(translation, scale);
    let instances = assemble_model(&mut engine, model, shader, &placement)
        .context("scene assembly failed")?;

    engine.set_camera(Camera::new_perspective(
        vec3(0.0, 0.0, 4.0),
        vec3(0.0, 0.0, 0.0),
        corelib::Vec3::Y,
        60f32.to_radians(),
        0.1,
        100.0,
        16.0 / 9.0,
    ));
    engine.add_point_light(PointLight::white(vec3(2.0, 4.0, 2.0), 1.0));
    engine.draw_scene();

    log::info!("Registered {} instances. Bye!", instances.len());
    Ok(())
}
