//! End-to-end distribution through the public API, with real decoding,
//! rendering and encoding.

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use threadcards::config::{Config, LoadingConfig};
use threadcards::data_uri;
use threadcards::distribute::{ImageDistributor, MidSequence, SlotImage};
use threadcards::imaging::{NumberedImageGenerator, RasterRenderer, RenderStyle};
use threadcards::loader::DefaultLoader;

fn png_data_uri(width: u32, height: u32, color: [u8; 3]) -> String {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png).unwrap();
    data_uri::encode("image/png", &bytes.into_inner())
}

fn small_generator(allow_files: bool) -> NumberedImageGenerator<DefaultLoader, RasterRenderer> {
    let mut config = Config::default();
    config.canvas.width = 160;
    config.canvas.height = 90;
    let style = RenderStyle::from_config(&config).unwrap();
    let loader = DefaultLoader::new(&LoadingConfig {
        allow_files,
        ..LoadingConfig::default()
    })
    .unwrap();
    NumberedImageGenerator::new(loader, RasterRenderer::new(), style)
}

fn decode(slot: &SlotImage) -> image::DynamicImage {
    match slot {
        SlotImage::Rendered(img) => image::load_from_memory(&img.bytes).unwrap(),
        other => panic!("expected a rendered slot, got {other:?}"),
    }
}

#[test]
fn single_image_thread() {
    let hero = png_data_uri(320, 240, [200, 120, 40]);
    let generator = small_generator(false);
    let distribution =
        ImageDistributor::new(&generator, MidSequence::Overlay).distribute(&[hero.clone()], 4);

    assert_eq!(distribution.len(), 4);
    assert_eq!(distribution.slots[0], SlotImage::Source(hero.clone()));
    for slot in &distribution.slots[1..] {
        let img = decode(slot);
        assert_eq!((img.width(), img.height()), (160, 90));
    }

    let references = distribution.to_references();
    assert_eq!(references[0], hero);
    assert!(references[1..].iter().all(|r| r.starts_with("data:image/jpeg;base64,")));

    let coverage = distribution.coverage();
    assert_eq!(coverage.posts_with_images, 4);
    assert_eq!(coverage.coverage_percent, 100);
}

#[test]
fn more_images_than_posts() {
    let images = vec![
        png_data_uri(50, 50, [255, 0, 0]),
        png_data_uri(50, 50, [0, 255, 0]),
        png_data_uri(50, 50, [0, 0, 255]),
    ];
    let generator = small_generator(false);

    let overlay = ImageDistributor::new(&generator, MidSequence::Overlay).distribute(&images, 2);
    assert_eq!(overlay.slots[0], SlotImage::Source(images[0].clone()));
    let second = decode(&overlay.slots[1]).to_rgb8();
    // Green base under a 60% black overlay, away from the numeral
    let [r, g, b] = second.get_pixel(2, 2).0;
    assert!(r < 20 && b < 20, "r={r} b={b}");
    assert!((85..=120).contains(&g), "g={g}");

    let verbatim = ImageDistributor::new(&generator, MidSequence::Verbatim).distribute(&images, 2);
    assert_eq!(verbatim.to_references(), images[..2].to_vec());
}

#[test]
fn no_images_and_empty_thread() {
    let generator = small_generator(false);
    let distributor = ImageDistributor::new(&generator, MidSequence::Overlay);

    assert!(distributor.distribute(&[], 0).is_empty());

    let tiles = distributor.distribute(&[], 3);
    assert_eq!(tiles.len(), 3);
    assert!(tiles.slots.iter().all(|s| matches!(s, SlotImage::Rendered(_))));
    assert_eq!(tiles.coverage().unique_images, 3);
}

#[test]
fn unreadable_images_still_produce_a_card_per_post() {
    let tmp = tempfile::TempDir::new().unwrap();
    let broken = tmp.path().join("broken.png");
    std::fs::write(&broken, b"not a png").unwrap();
    let images = vec![
        png_data_uri(40, 40, [10, 10, 10]),
        broken.to_string_lossy().into_owned(),
        tmp.path().join("missing.png").to_string_lossy().into_owned(),
    ];

    let generator = small_generator(true);
    let distribution =
        ImageDistributor::new(&generator, MidSequence::Overlay).distribute(&images, 5);

    assert_eq!(distribution.len(), 5);
    // Posts 2 and 3 fall back to palette tiles colored by their index
    for i in [1, 2] {
        let img = decode(&distribution.slots[i]).to_rgb8();
        let expected = generator.style().color_for_index(i);
        let [r, g, b] = img.get_pixel(1, 1).0;
        for (got, want) in [(r, expected.r), (g, expected.g), (b, expected.b)] {
            assert!(got.abs_diff(want) <= 6, "post {} got {got} want {want}", i + 1);
        }
    }
    assert!(distribution.slots.iter().all(|s| !s.is_empty()));
}
