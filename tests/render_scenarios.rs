use std::io::Cursor;

use photocard::{
    BlendMode, Canvas, Command, Editor, EditorConfig, FilterSettings, FrameRGBA, Rgb8,
    export::encode_png,
};

const N: u32 = 60;

fn encode(img: image::RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn solid(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    encode(image::RgbaImage::from_pixel(w, h, image::Rgba(px)))
}

fn gradient(w: u32, h: u32) -> Vec<u8> {
    encode(image::RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba([(x * 6) as u8, (y * 12) as u8, 128, 255])
    }))
}

/// Opaque green 3px border around a transparent window.
fn border_template(size: u32) -> Vec<u8> {
    encode(image::RgbaImage::from_fn(size, size, |x, y| {
        let edge = x < 3 || y < 3 || x >= size - 3 || y >= size - 3;
        if edge {
            image::Rgba([0, 255, 0, 255])
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    }))
}

fn editor_with(photo: Vec<u8>, template: Vec<u8>) -> Editor {
    let cfg = EditorConfig::default().with_canvas(Canvas::new(N, N).unwrap());
    let mut ed = Editor::new(cfg).unwrap();
    ed.load_photo(photo, Some("image/png")).unwrap();
    ed.load_template(template, Some("image/png")).unwrap();
    ed
}

fn frame(ed: &Editor) -> FrameRGBA {
    ed.frame().cloned().expect("editor should be painted")
}

fn near(a: [u8; 4], b: [u8; 4], tol: u8) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= tol)
}

#[test]
fn canvas_sized_photo_fills_frame_under_template() {
    let ed = editor_with(solid(N, N, [255, 0, 0, 255]), border_template(N));
    let f = frame(&ed);
    assert_eq!((f.width, f.height), (N, N));

    for (x, y) in [(3, 3), (30, 30), (56, 10), (10, 56)] {
        let px = f.pixel(x, y).unwrap();
        assert!(near(px, [255, 0, 0, 255], 2), "({x},{y}) = {px:?}");
    }
    for (x, y) in [(0, 0), (2, 30), (59, 59), (30, 58)] {
        assert_eq!(f.pixel(x, y), Some([0, 255, 0, 255]), "({x},{y})");
    }
}

#[test]
fn guides_are_drawn_only_when_visible() {
    let mut ed = editor_with(solid(N, N, [255, 0, 0, 255]), border_template(N));
    let plain = frame(&ed);
    assert!(near(plain.pixel(30, 10).unwrap(), [255, 0, 0, 255], 2));

    ed.set_guides(true).unwrap();
    let guided = frame(&ed);
    let px = guided.pixel(30, 10).unwrap();
    assert!(px[0] < 200 && px[2] > 60, "centerline dash expected, got {px:?}");

    ed.toggle_guides().unwrap();
    assert_eq!(frame(&ed), plain);
}

#[test]
fn four_quarter_turns_are_pixel_identical() {
    let mut ed = editor_with(gradient(40, 20), solid(N, N, [0, 0, 0, 0]));
    let before = frame(&ed);
    for i in 0..4 {
        ed.dispatch(Command::RotateRight).unwrap();
        if i < 3 {
            assert_ne!(frame(&ed), before, "turn {i} should change the frame");
        }
    }
    assert_eq!(ed.state().rotation_deg, 0.0);
    assert_eq!(frame(&ed), before);
}

#[test]
fn zoom_in_saturates_at_max_scale() {
    let mut ed = editor_with(gradient(40, 20), solid(N, N, [0, 0, 0, 0]));
    let mut last = true;
    for _ in 0..25 {
        last = ed.dispatch(Command::ZoomIn).unwrap();
    }
    assert_eq!(ed.state().scale, 3.0);
    assert!(!last);

    let depth = ed.history().undo_len();
    assert!(!ed.dispatch(Command::ZoomIn).unwrap());
    assert_eq!(ed.history().undo_len(), depth);
}

#[test]
fn background_shows_around_a_zoomed_out_photo() {
    let mut ed = editor_with(solid(N, N, [255, 0, 0, 255]), solid(N, N, [0, 0, 0, 0]));
    ed.dispatch(Command::SetBackground {
        color: Rgb8::new(10, 20, 30),
    })
    .unwrap();
    for _ in 0..5 {
        ed.dispatch(Command::ZoomOut).unwrap();
    }
    let f = frame(&ed);
    assert_eq!(f.pixel(0, 0), Some([10, 20, 30, 255]));
    assert_eq!(f.pixel(59, 59), Some([10, 20, 30, 255]));
    assert!(near(f.pixel(30, 30).unwrap(), [255, 0, 0, 255], 2));
}

#[test]
fn grayscale_filter_reaches_the_frame() {
    let mut ed = editor_with(solid(N, N, [255, 0, 0, 255]), solid(N, N, [0, 0, 0, 0]));
    ed.dispatch(Command::SetFilters {
        filters: FilterSettings {
            grayscale: 100.0,
            ..FilterSettings::NEUTRAL
        },
    })
    .unwrap();
    let px = frame(&ed).pixel(30, 30).unwrap();
    assert!(near(px, [54, 54, 54, 255], 3), "{px:?}");
}

#[test]
fn multiply_over_black_background_stays_black() {
    let mut ed = editor_with(solid(N, N, [200, 150, 100, 255]), solid(N, N, [0, 0, 0, 0]));
    ed.dispatch(Command::SetBackground { color: Rgb8::BLACK })
        .unwrap();
    ed.dispatch(Command::SetBlendMode {
        mode: BlendMode::Multiply,
    })
    .unwrap();
    let px = frame(&ed).pixel(30, 30).unwrap();
    assert!(near(px, [0, 0, 0, 255], 1), "{px:?}");
}

#[test]
fn confirm_excludes_guides_and_keeps_them_on_screen() {
    let mut ed = editor_with(gradient(50, 50), border_template(N));
    ed.dispatch(Command::RotateLeft).unwrap();
    let expected = encode_png(&frame(&ed)).unwrap();

    ed.set_guides(true).unwrap();
    let guided = frame(&ed);
    let confirmation = ed.confirm().unwrap();

    assert_eq!(confirmation.image, expected);
    assert_eq!((confirmation.image.width, confirmation.image.height), (N, N));
    assert!(ed.guides_visible());
    assert_eq!(frame(&ed), guided);
}

#[test]
fn same_inputs_render_identical_frames() {
    let script = [
        Command::ZoomIn,
        Command::RotateRight,
        Command::PointerDown { x: 30.0, y: 30.0 },
        Command::PointerMove { x: 12.0, y: 41.0 },
        Command::PointerUp,
        Command::SetBlendMode {
            mode: BlendMode::Screen,
        },
    ];
    let run = || {
        let mut ed = editor_with(gradient(40, 20), border_template(N));
        for cmd in script.clone() {
            ed.dispatch(cmd).unwrap();
        }
        frame(&ed)
    };
    assert_eq!(run(), run());
}
