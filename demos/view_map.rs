use macroquad::prelude::*;
use macroquad_tiled_mesh::{ImportOptions, TiledScene};

fn window_conf() -> Conf {
    Conf {
        window_title: "Tiled Mesh Viewer".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

const LAYER_KEYS: [KeyCode; 9] = [
    KeyCode::Key1,
    KeyCode::Key2,
    KeyCode::Key3,
    KeyCode::Key4,
    KeyCode::Key5,
    KeyCode::Key6,
    KeyCode::Key7,
    KeyCode::Key8,
    KeyCode::Key9,
];

// usage: cargo run --example view_map -- assets/map.json (or .tmx) [import.json]
#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let map_path = args.next().unwrap_or_else(|| "assets/map.json".to_owned());
    let options = match args.next() {
        Some(path) => ImportOptions::load(path).expect("Failed to load import options"),
        None => ImportOptions::default(),
    };

    let mut scene = TiledScene::load(&map_path, &options).expect("Failed to load map");
    let target = scene.center(Vec3::from(options.origin));
    let radius = scene.width.max(scene.height) as f32 * 1.2 + 4.0;
    let mut yaw: f32 = -std::f32::consts::FRAC_PI_2;
    let mut pitch: f32 = 0.0;

    loop {
        let dt = get_frame_time();
        if is_key_down(KeyCode::Left) {
            yaw -= dt;
        }
        if is_key_down(KeyCode::Right) {
            yaw += dt;
        }
        if is_key_down(KeyCode::Up) {
            pitch = (pitch + dt).min(1.4);
        }
        if is_key_down(KeyCode::Down) {
            pitch = (pitch - dt).max(-1.4);
        }
        for (i, key) in LAYER_KEYS.iter().enumerate() {
            if is_key_pressed(*key) {
                if let Some(layer) = scene.layers.get_mut(i) {
                    layer.visible = !layer.visible;
                }
            }
        }

        clear_background(BLACK);

        // layers lie in the XZ plane, stacked along -Y
        let eye = target + radius * vec3(yaw.cos() * pitch.cos(), yaw.sin() * pitch.cos(), pitch.sin());
        set_camera(&Camera3D {
            position: eye,
            target,
            up: vec3(0.0, 0.0, 1.0),
            ..Default::default()
        });
        scene.draw();

        set_default_camera();
        for (i, layer) in scene.layers.iter().enumerate() {
            let color = if layer.visible { WHITE } else { GRAY };
            draw_text(&format!("[{}] {}", i + 1, layer.name), 20.0, 30.0 + i as f32 * 24.0, 24.0, color);
        }
        draw_text(&format!("FPS: {}", get_fps()), screen_width() - 135.0, 55.0, 30.0, RED);

        next_frame().await;
    }
}
