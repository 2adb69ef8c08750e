//! Offset tables at the front of sprite files.
//!
//! A single image starts with a `u32` frame count followed by `count + 1` offsets, relative to
//! the image start, bounding each frame. Files holding several images first list one `u32`
//! offset per image, each pointing at such a table.

use std::ops::Range;

use bytes::Bytes;
use nom::{combinator::verify, multi::count, number::complete::le_u32, IResult};

use crate::{
    error::{Error, Result},
    path::split_extension,
    properties::PropertyRecord,
};

/// One frame's bytes, before decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Name of the image the frame belongs to
    pub alias: String,
    /// Position within its image
    pub index: usize,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOffsetTable {
    offsets: Vec<u32>,
}

fn parse_offsets(input: &[u8]) -> IResult<&[u8], Vec<u32>> {
    let (input, frame_count) = verify(le_u32, |n: &u32| (*n as usize) < input.len() / 4)(input)?;
    count(le_u32, frame_count as usize + 1)(input)
}

fn parse_image_starts(input: &[u8], image_count: usize) -> IResult<&[u8], Vec<u32>> {
    count(le_u32, image_count)(input)
}

fn invalid(name: &str, reason: String) -> Error {
    Error::InvalidOffsetTable {
        name: name.to_string(),
        reason,
    }
}

/// Offsets must be non-decreasing and end within `len`
fn check_bounds(name: &str, offsets: &[u32], len: usize) -> Result<()> {
    if let Some(w) = offsets.windows(2).find(|w| w[0] > w[1]) {
        return Err(invalid(name, format!("offset {} follows {}", w[1], w[0])));
    }

    match offsets.last() {
        Some(&last) if last as usize > len => Err(invalid(
            name,
            format!("offset {last} is past the end ({len} bytes)"),
        )),
        _ => Ok(()),
    }
}

impl FrameOffsetTable {
    pub fn parse(name: &str, image: &[u8]) -> Result<Self> {
        let (_, offsets) = parse_offsets(image)
            .map_err(|_| invalid(name, "truncated frame table".to_string()))?;
        check_bounds(name, &offsets, image.len())?;

        Ok(Self { offsets })
    }

    pub fn frame_count(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn frame_range(&self, index: usize) -> Option<Range<usize>> {
        let start = *self.offsets.get(index)? as usize;
        let end = *self.offsets.get(index + 1)? as usize;
        Some(start..end)
    }

    pub fn frame_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.offsets
            .windows(2)
            .map(|w| w[0] as usize..w[1] as usize)
    }
}

/// Byte ranges of each image in a file
pub fn image_ranges(name: &str, data: &[u8], image_count: usize) -> Result<Vec<Range<usize>>> {
    if image_count <= 1 {
        return Ok(vec![0..data.len()]);
    }

    let (_, starts) = parse_image_starts(data, image_count)
        .map_err(|_| invalid(name, "truncated image table".to_string()))?;
    check_bounds(name, &starts, data.len())?;

    let ends = starts
        .iter()
        .skip(1)
        .map(|&s| s as usize)
        .chain(std::iter::once(data.len()));

    Ok(starts
        .iter()
        .zip(ends)
        .map(|(&start, end)| start as usize..end)
        .collect())
}

/// Name of one image of a file. Multi image files number their images after the stem,
/// e.g. `zombiew3.cl2`.
pub fn image_alias(file_name: &str, image: usize, image_count: usize) -> String {
    if image_count <= 1 {
        return file_name.to_string();
    }

    match split_extension(file_name) {
        (stem, Some(ext)) => format!("{stem}{image}.{ext}"),
        (stem, None) => format!("{stem}{image}"),
    }
}

/// Slice a file into its frames, dropping each frame's header
pub fn read_frames(file_name: &str, data: &Bytes, record: &PropertyRecord) -> Result<Vec<RawFrame>> {
    let mut frames = Vec::new();

    for (image, range) in image_ranges(file_name, data, record.image_count)?
        .into_iter()
        .enumerate()
    {
        let alias = image_alias(file_name, image, record.image_count);
        let image_data = data.slice(range);
        let table = FrameOffsetTable::parse(&alias, &image_data)?;

        for (index, frame) in table.frame_ranges().enumerate() {
            if frame.len() < record.frame_header_size {
                return Err(invalid(
                    &alias,
                    format!(
                        "frame {index} is {} bytes, shorter than its {} byte header",
                        frame.len(),
                        record.frame_header_size
                    ),
                ));
            }

            frames.push(RawFrame {
                alias: alias.clone(),
                index,
                bytes: image_data.slice(frame.start + record.frame_header_size..frame.end),
            });
        }
    }

    Ok(frames)
}

/// Build a single image: frame table followed by the frames
#[cfg(test)]
pub(crate) fn build_image(frames: &[&[u8]]) -> Vec<u8> {
    let table_len = 4 * (frames.len() + 2);
    let mut out = (frames.len() as u32).to_le_bytes().to_vec();

    let mut offset = table_len;
    out.extend((offset as u32).to_le_bytes());
    for frame in frames {
        offset += frame.len();
        out.extend((offset as u32).to_le_bytes());
    }

    frames.iter().for_each(|f| out.extend(*f));
    out
}

/// Several images behind an image table
#[cfg(test)]
pub(crate) fn build_multi_image(images: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut offset = 4 * images.len();
    for image in images {
        out.extend((offset as u32).to_le_bytes());
        offset += image.len();
    }
    images.iter().for_each(|i| out.extend(i));
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::properties::PropertyRegistry;

    fn record(images: usize, header: usize) -> PropertyRecord {
        PropertyRegistry::parse(&format!(
            "[a.cl2]\nimages = {images}\nheader = {header}\nwidth = 1\nheight = 1\n"
        ))
        .unwrap()
        .record("a.cl2")
        .unwrap()
        .clone()
    }

    #[test]
    fn single_image_table() {
        let data = build_image(&[&[1, 2], &[], &[3, 4, 5]]);
        let table = FrameOffsetTable::parse("a.cel", &data).unwrap();

        assert_eq!(table.frame_count(), 3);
        assert_eq!(table.frame_range(0), Some(20..22));
        assert_eq!(table.frame_range(1), Some(22..22));
        assert_eq!(table.frame_range(2), Some(22..25));
        assert_eq!(table.frame_range(3), None);
    }

    #[test]
    fn rejects_bad_tables() {
        // Count larger than the buffer
        assert!(FrameOffsetTable::parse("a.cel", &[9, 0, 0, 0, 0, 0, 0, 0]).is_err());

        // Decreasing offsets
        let mut data = build_image(&[&[1, 2], &[3]]);
        data[8..12].copy_from_slice(&100u32.to_le_bytes());
        assert!(matches!(
            FrameOffsetTable::parse("a.cel", &data),
            Err(Error::InvalidOffsetTable { .. })
        ));

        // Past the end
        let mut data = build_image(&[&[1, 2]]);
        data[8..12].copy_from_slice(&100u32.to_le_bytes());
        assert!(FrameOffsetTable::parse("a.cel", &data).is_err());
    }

    #[test]
    fn multi_image_frames_and_headers() {
        let images = vec![
            build_image(&[&[0, 0, 1], &[0, 0, 2, 3]]),
            build_image(&[&[0, 0, 4]]),
        ];
        let data = Bytes::from(build_multi_image(&images));

        let frames = read_frames("a.cl2", &data, &record(2, 2)).unwrap();
        let summary = frames
            .iter()
            .map(|f| (f.alias.as_str(), f.index, f.bytes.to_vec()))
            .collect::<Vec<_>>();

        assert_eq!(
            summary,
            vec![
                ("a0.cl2", 0, vec![1]),
                ("a0.cl2", 1, vec![2, 3]),
                ("a1.cl2", 0, vec![4]),
            ]
        );
    }

    #[test]
    fn header_longer_than_frame() {
        let data = Bytes::from(build_image(&[&[1]]));
        assert!(matches!(
            read_frames("a.cl2", &data, &record(1, 2)),
            Err(Error::InvalidOffsetTable { .. })
        ));
    }

    #[test]
    fn aliases() {
        assert_eq!(image_alias("zombiew.cl2", 0, 1), "zombiew.cl2");
        assert_eq!(image_alias("zombiew.cl2", 3, 8), "zombiew3.cl2");
    }
}
