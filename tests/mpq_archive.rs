mod common;

use std::{fs, sync::Arc};

use common::{build_image, build_mpq, palette_bytes};
use d1_tools::{
    archive::{ArchiveStore, MpqArchive},
    art::{AssetCache, SpriteDecoder},
    bundle_fs::FS,
    properties::PropertyRegistry,
    Error,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const PROPERTIES: &str = r#"
[palettes]
town = levels\towndata\town.pal

[square.cel]
width = 2
height = 2
"#;

fn write_archive(dir: &TempDir) -> std::path::PathBuf {
    let listfile = b"levels\\towndata\\town.pal\r\ndata\\square.cel\r\n".to_vec();
    let data = build_mpq(&[
        ("(listfile)", listfile),
        ("levels\\towndata\\town.pal", palette_bytes()),
        ("data\\square.cel", build_image(&[vec![4, 1, 2, 3, 4]])),
    ]);

    // Headers may sit at any 512 byte boundary
    let mut padded = vec![0u8; 0x400];
    padded.extend(data);

    let path = dir.path().join("diabdat.mpq");
    fs::write(&path, padded).unwrap();
    path
}

#[test]
fn opens_archive_from_disk() {
    let dir = TempDir::new().unwrap();
    let archive = MpqArchive::open(&write_archive(&dir)).unwrap();

    assert_eq!(
        archive.list(),
        vec!["levels\\towndata\\town.pal", "data\\square.cel"]
    );
    assert!(archive.contains("Data\\Square.cel"));
    assert_eq!(
        archive.read("levels\\towndata\\town.pal").unwrap().as_ref(),
        palette_bytes().as_slice()
    );
}

#[test]
fn external_listfile_replaces_names() {
    let dir = TempDir::new().unwrap();
    let fs = FS::from_mpq(&write_archive(&dir), Some(b"data\\square.cel".as_slice())).unwrap();
    assert_eq!(fs.list().collect::<Vec<_>>(), vec!["data\\square.cel"]);
}

#[test]
fn decodes_sprites_from_disk() {
    let dir = TempDir::new().unwrap();
    let fs = FS::from_mpq(&write_archive(&dir), None).unwrap();
    let registry = Arc::new(PropertyRegistry::parse(PROPERTIES).unwrap());

    let cache = AssetCache::new(fs.clone(), Arc::clone(&registry));
    let palette = cache.palette("town").unwrap();
    assert_eq!(palette.transparent_index(), Some(255));

    let decoder = SpriteDecoder::new(fs, registry);
    let rasters = decoder.decode("/data/square.cel", &palette).unwrap();
    assert_eq!(rasters[0].pixels(), &[3, 4, 1, 2]);

    let image = rasters[0].to_rgba_image();
    assert_eq!(image.get_pixel(0, 1).0, [1, 1, 1, 0xFF]);

    assert!(matches!(
        decoder.decode("data/missing.cel", &palette),
        Err(Error::MemberNotFound(_))
    ));
}
