mod common;

use std::sync::Arc;

use common::{build_image, cel_literal, palette_bytes, tile, LEFT_ZERO_OFFSETS, RIGHT_ZERO_OFFSETS};
use d1_tools::{
    archive::MemoryArchive,
    art::{
        decoders::{TileShape, TileSide},
        select_decoder, DecoderKind, Palette, SpriteDecoder,
    },
    bundle::read_header,
    bundle_fs::FS,
    error::DecodeError,
    properties::PropertyRegistry,
    Error,
};
use pretty_assertions::assert_eq;

const PROPERTIES: &str = r#"
[palettes]
town = levels\towndata\town.pal
l1 = levels\l1data\l1.pal

[square.cel]
width = 2
height = 2

[thin.cl2]
width = 1
height = 3

[l1.cel]
width = 32
height = 32
palettes = l1

[walk.cl2]
images = 2
header = 10
width = 4
height = 1
width.1 = 2
"#;

fn palette(name: &str) -> Arc<Palette> {
    Arc::new(Palette::from_bytes(name, &palette_bytes()).unwrap())
}

fn level_tiles() -> Vec<Vec<u8>> {
    vec![
        vec![5u8; 1024],
        tile(0x220, &LEFT_ZERO_OFFSETS, 6),
        tile(0x320, &RIGHT_ZERO_OFFSETS, 7),
        cel_literal(1024, 8),
    ]
}

fn walk_image(first_width: usize, second_width: usize) -> Vec<u8> {
    let header = [0u8; 10];
    let frame = |width: usize, color: u8| {
        let mut f = header.to_vec();
        // CL2 literal run of `width` pixels
        f.push((-(width as i8)) as u8);
        f.extend(std::iter::repeat(color).take(width));
        f
    };
    build_image(&[frame(first_width, 1), frame(second_width, 2)])
}

fn decoder() -> SpriteDecoder {
    let walk = [walk_image(4, 2), walk_image(4, 2)];
    let mut walk_file = Vec::new();
    walk_file.extend(8u32.to_le_bytes());
    walk_file.extend((8 + walk[0].len() as u32).to_le_bytes());
    walk.iter().for_each(|w| walk_file.extend(w));

    let archive = MemoryArchive::new()
        .with("data\\square.cel", build_image(&[vec![4, 0xA, 0xB, 0xC, 0xD]]))
        .with("data\\thin.cl2", build_image(&[vec![0xFE, 0x0A, 0x0B, 0x03]]))
        .with("levels\\l1data\\l1.cel", build_image(&level_tiles()))
        .with("monsters\\walk.cl2", walk_file);

    SpriteDecoder::new(
        FS::new(archive),
        Arc::new(PropertyRegistry::parse(PROPERTIES).unwrap()),
    )
}

#[test]
fn two_by_two_cel_is_written_bottom_up() {
    let rasters = decoder().decode("data/square.cel", &palette("town")).unwrap();

    assert_eq!(rasters.len(), 1);
    let raster = &rasters[0];
    assert_eq!((raster.width(), raster.height()), (2, 2));
    // Bottom row holds the first two bytes
    assert_eq!(raster.row(1).unwrap(), &[0xA, 0xB]);
    assert_eq!(raster.row(0).unwrap(), &[0xC, 0xD]);
}

#[test]
fn cl2_overflow_is_an_integrity_error() {
    let err = decoder().decode("data/thin.cl2", &palette("town")).unwrap_err();
    assert!(matches!(
        err,
        Error::Decode {
            source: DecodeError::Overflow { .. },
            ..
        }
    ));
}

#[test]
fn every_decoder_family_fills_the_raster() {
    let decoder = decoder();
    let frames = decoder.frames("levels/l1data/l1.cel").unwrap();
    let kinds = frames
        .iter()
        .map(|f| select_decoder("l1.cel", f.index, &f.bytes).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            DecoderKind::TileOpaque,
            DecoderKind::TileImplicit {
                side: TileSide::Left,
                shape: TileShape::UpperLower
            },
            DecoderKind::TileImplicit {
                side: TileSide::Right,
                shape: TileShape::UpperOnly
            },
            DecoderKind::Cel,
        ]
    );

    let rasters = decoder.decode("levels/l1data/l1.cel", &palette("l1")).unwrap();
    assert_eq!(rasters.len(), 4);
    for raster in &rasters {
        assert!(raster.is_complete());
        assert_eq!(raster.pixels().len(), 32 * 32);
    }

    // Implicit pixels come out transparent
    assert_eq!(rasters[1].pixel(0, 31), Some(255));
    assert_eq!(rasters[2].pixel(31, 31), Some(255));
    assert!(rasters[3].pixels().iter().all(|&p| p == 8));
}

#[test]
fn multi_image_files_use_per_frame_sizes() {
    let decoder = decoder();
    let frames = decoder.frames("monsters/walk.cl2").unwrap();
    let aliases = frames
        .iter()
        .map(|f| (f.alias.as_str(), f.index))
        .collect::<Vec<_>>();
    assert_eq!(
        aliases,
        vec![("walk0.cl2", 0), ("walk0.cl2", 1), ("walk1.cl2", 0), ("walk1.cl2", 1)]
    );

    let rasters = decoder.decode("monsters/walk.cl2", &palette("town")).unwrap();
    let sizes = rasters.iter().map(|r| r.width()).collect::<Vec<_>>();
    assert_eq!(sizes, vec![4, 2, 4, 2]);
    assert_eq!(rasters[1].pixels(), &[2, 2]);
}

#[test]
fn decoding_is_deterministic() {
    let decoder = decoder();
    let palette = palette("l1");
    let first = decoder.decode("levels/l1data/l1.cel", &palette).unwrap();
    let second = decoder.decode("levels/l1data/l1.cel", &palette).unwrap();
    assert_eq!(first, second);
}

#[test]
fn incompatible_palette_is_rejected() {
    assert!(matches!(
        decoder().decode("levels/l1data/l1.cel", &palette("town")),
        Err(Error::IncompatiblePalette { .. })
    ));
}

#[test]
fn bundle_round_trip() {
    let p1 = vec![1u8; 13];
    let p2 = vec![2u8; 7];
    let fs = FS::new(
        MemoryArchive::new()
            .with("levels\\l1data\\l1.til", p1.clone())
            .with("levels\\l1data\\l1.min", p2.clone()),
    );

    let resolved = fs.resolve("levels/l1data/l1.til+levels/l1data/l1.min").unwrap();
    let (header, data_start) = read_header(&resolved.buffer).unwrap().unwrap();
    assert_eq!(data_start, header.serialized_size());
    assert_eq!(data_start, resolved.data_start);

    let entries = header
        .entries
        .iter()
        .map(|e| (e.path.as_str(), e.start_offset))
        .collect::<Vec<_>>();
    assert_eq!(
        entries,
        vec![
            ("levels\\l1data\\l1.til", 0),
            ("levels\\l1data\\l1.min", p1.len() as u64)
        ]
    );

    let members = resolved.members().unwrap();
    assert_eq!(members[0].bytes.as_ref(), p1.as_slice());
    assert_eq!(members[1].bytes.as_ref(), p2.as_slice());

    let single = fs.resolve("levels/l1data/l1.til").unwrap();
    assert_eq!(single.data_start, 0);
    assert_eq!(read_header(&single.buffer).unwrap(), None);
}

#[test]
fn bundles_of_sprites_decode_in_order() {
    let rasters = decoder()
        .decode("data/square.cel+/data/square.cel/", &palette("town"))
        .unwrap();
    assert_eq!(rasters.len(), 2);
    assert_eq!(rasters[0], rasters[1]);
}

#[test]
fn opaque_tile_exception() {
    let data = vec![1u8; 0x400];
    assert_eq!(
        select_decoder("l1.cel", 0, &data).unwrap(),
        DecoderKind::TileOpaque
    );
    assert_ne!(
        select_decoder("l1.cel", 148, &data).unwrap(),
        DecoderKind::TileOpaque
    );
}

#[test]
fn row_tables_cover_the_tile_budgets() {
    assert_eq!(TileShape::UpperLower.frame_size(), 544);
    assert_eq!(TileShape::UpperOnly.frame_size(), 800);
}
