use bytemuck::cast_slice_mut;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io;

use crate::bitmap::container::{Container, ARRAY_LIMIT};
use crate::bitmap::store::{ArrayStore, BitmapStore, IntervalStore, Store, BITMAP_LENGTH};
use crate::Bitmap;

pub const SERIAL_COOKIE_NO_RUNCONTAINER: u32 = 12346;
pub const SERIAL_COOKIE: u16 = 12347;
pub const NO_OFFSET_THRESHOLD: usize = 4;

// Sizes of header structures
pub const DESCRIPTION_BYTES: usize = 4;
pub const OFFSET_BYTES: usize = 4;

fn invalid_data(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Number of bytes the given container stream takes in the portable format.
pub(crate) fn serialized_stream_size<'a, I>(containers: I) -> usize
where
    I: ExactSizeIterator<Item = (u16, &'a Store)> + Clone,
{
    let size = containers.len();
    let has_runs = containers.clone().any(|(_, store)| matches!(store, Store::Run(_)));

    let header_size = if has_runs {
        4 + (size + 7) / 8
            + if size >= NO_OFFSET_THRESHOLD { OFFSET_BYTES * size } else { 0 }
    } else {
        4 + 4 + OFFSET_BYTES * size
    };

    header_size
        + DESCRIPTION_BYTES * size
        + containers.map(|(_, store)| store.byte_size()).sum::<usize>()
}

/// Writes a container stream in the portable format.
pub(crate) fn serialize_container_stream<'a, I, W>(containers: I, mut writer: W) -> io::Result<()>
where
    I: ExactSizeIterator<Item = (u16, &'a Store)> + Clone,
    W: io::Write,
{
    let size = containers.len();
    let has_runs = containers.clone().any(|(_, store)| matches!(store, Store::Run(_)));

    let mut offset = if has_runs {
        writer.write_u32::<LittleEndian>(
            u32::from(SERIAL_COOKIE) | ((size as u32 - 1) << 16),
        )?;
        let mut run_bitset = vec![0u8; (size + 7) / 8];
        for (i, (_, store)) in containers.clone().enumerate() {
            if matches!(store, Store::Run(_)) {
                run_bitset[i / 8] |= 1 << (i % 8);
            }
        }
        writer.write_all(&run_bitset)?;
        let offsets_size =
            if size >= NO_OFFSET_THRESHOLD { OFFSET_BYTES * size } else { 0 };
        4 + run_bitset.len() + DESCRIPTION_BYTES * size + offsets_size
    } else {
        writer.write_u32::<LittleEndian>(SERIAL_COOKIE_NO_RUNCONTAINER)?;
        writer.write_u32::<LittleEndian>(size as u32)?;
        4 + 4 + DESCRIPTION_BYTES * size + OFFSET_BYTES * size
    };

    for (key, store) in containers.clone() {
        writer.write_u16::<LittleEndian>(key)?;
        writer.write_u16::<LittleEndian>((store.len() - 1) as u16)?;
    }

    if !has_runs || size >= NO_OFFSET_THRESHOLD {
        for (_, store) in containers.clone() {
            writer.write_u32::<LittleEndian>(offset as u32)?;
            offset += store.byte_size();
        }
    }

    for (_, store) in containers {
        match store {
            Store::Array(vec) => {
                for &value in vec.iter() {
                    writer.write_u16::<LittleEndian>(value)?;
                }
            }
            Store::Bitmap(bits) => {
                for &value in bits.as_array() {
                    writer.write_u64::<LittleEndian>(value)?;
                }
            }
            Store::Run(runs) => {
                writer.write_u16::<LittleEndian>(runs.n_runs() as u16)?;
                for iv in runs.iter_intervals() {
                    writer.write_u16::<LittleEndian>(iv.start)?;
                    writer.write_u16::<LittleEndian>(iv.end - iv.start)?;
                }
            }
        }
    }

    Ok(())
}

/// Reads a container stream in the portable format.
///
/// With `check` set, every structural invariant of the stream is validated
/// before the data is trusted; without it the data is assumed valid but the
/// read stays memory safe.
pub(crate) fn deserialize_container_stream<R: io::Read>(
    mut reader: R,
    check: bool,
) -> io::Result<Vec<Container>> {
    // First read the cookie to determine which version of the format we are
    // reading
    let (size, has_offsets, has_run_containers) = {
        let cookie = reader.read_u32::<LittleEndian>()?;
        if cookie == SERIAL_COOKIE_NO_RUNCONTAINER {
            (reader.read_u32::<LittleEndian>()? as usize, true, false)
        } else if (cookie as u16) == SERIAL_COOKIE {
            let size = ((cookie >> 16) + 1) as usize;
            (size, size >= NO_OFFSET_THRESHOLD, true)
        } else {
            return Err(invalid_data("unknown cookie value"));
        }
    };

    if size > u16::MAX as usize + 1 {
        return Err(invalid_data("size is greater than supported"));
    }

    // Read the run container bitmap if necessary
    let run_container_bitmap = if has_run_containers {
        let mut bitmap = vec![0u8; (size + 7) / 8];
        reader.read_exact(&mut bitmap)?;
        Some(bitmap)
    } else {
        None
    };

    // Read the container descriptions
    let mut description_bytes = vec![0u8; size * DESCRIPTION_BYTES];
    reader.read_exact(&mut description_bytes)?;
    let mut description_bytes = &description_bytes[..];

    if has_offsets {
        let mut offsets = vec![0u8; size * OFFSET_BYTES];
        reader.read_exact(&mut offsets)?;
        drop(offsets); // Not useful when deserializing into memory
    }

    let mut containers: Vec<Container> = Vec::with_capacity(size);

    // Read each container
    for i in 0..size {
        let key = description_bytes.read_u16::<LittleEndian>()?;
        let cardinality = u64::from(description_bytes.read_u16::<LittleEndian>()?) + 1;

        if check {
            if let Some(last) = containers.last() {
                if last.key >= key {
                    return Err(invalid_data("container keys are not strictly increasing"));
                }
            }
        }

        // If the run container bitmap is present, check if this container
        // is a run container
        let is_run_container =
            run_container_bitmap.as_ref().map_or(false, |bm| bm[i / 8] & (1 << (i % 8)) != 0);

        let store = if is_run_container {
            let n_runs = reader.read_u16::<LittleEndian>()?;
            let mut intervals = vec![[0u16, 0u16]; n_runs as usize];
            reader.read_exact(cast_slice_mut(&mut intervals))?;
            intervals.iter_mut().for_each(|[s, len]| {
                *s = u16::from_le(*s);
                *len = u16::from_le(*len);
            });

            let mut runs = IntervalStore::new();
            for [start, len] in intervals {
                let end = match start.checked_add(len) {
                    Some(end) => end,
                    None => return Err(invalid_data("run exceeds the container range")),
                };
                if !runs.try_push_interval(start, end) {
                    if check {
                        return Err(invalid_data("runs are unsorted or overlapping"));
                    }
                    // Unchecked mode still refuses to build an inconsistent
                    // store, it just keeps whatever fit.
                }
            }
            if runs.is_empty() {
                return Err(invalid_data("empty run container"));
            }
            Store::Run(runs)
        } else if cardinality <= ARRAY_LIMIT {
            let mut values = vec![0u16; cardinality as usize];
            reader.read_exact(cast_slice_mut(&mut values))?;
            values.iter_mut().for_each(|n| *n = u16::from_le(*n));
            let array = if check {
                ArrayStore::try_from(values)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            } else {
                ArrayStore::from_vec_unchecked(values)
            };
            Store::Array(array)
        } else {
            let mut values = Box::new([0u64; BITMAP_LENGTH]);
            reader.read_exact(cast_slice_mut(&mut values[..]))?;
            values.iter_mut().for_each(|n| *n = u64::from_le(*n));
            let bitmap = if check {
                BitmapStore::try_from(cardinality, values)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            } else {
                BitmapStore::from_unchecked(cardinality, values)
            };
            Store::Bitmap(bitmap)
        };

        containers.push(Container::from_store(key, store));
    }

    Ok(containers)
}

impl Bitmap {
    /// Return the size in bytes of the serialized output.
    /// This is compatible with the official C/C++, Java and Go implementations.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap;
    ///
    /// let rb1: Bitmap = (1..4).collect();
    /// let mut bytes = Vec::with_capacity(rb1.serialized_size());
    /// rb1.serialize_into(&mut bytes).unwrap();
    /// let rb2 = Bitmap::deserialize_from(&bytes[..]).unwrap();
    ///
    /// assert_eq!(rb1, rb2);
    /// ```
    pub fn serialized_size(&self) -> usize {
        serialized_stream_size(self.containers.iter().map(|c| (c.key, c.store())))
    }

    /// Serialize this bitmap into [the standard Roaring on-disk format][format].
    /// This is compatible with the official C/C++, Java and Go implementations.
    ///
    /// [format]: https://github.com/RoaringBitmap/RoaringFormatSpec
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap;
    ///
    /// let rb1: Bitmap = (1..4).collect();
    /// let mut bytes = vec![];
    /// rb1.serialize_into(&mut bytes).unwrap();
    /// let rb2 = Bitmap::deserialize_from(&bytes[..]).unwrap();
    ///
    /// assert_eq!(rb1, rb2);
    /// ```
    pub fn serialize_into<W: io::Write>(&self, writer: W) -> io::Result<()> {
        serialize_container_stream(self.containers.iter().map(|c| (c.key, c.store())), writer)
    }

    /// Deserialize a bitmap into memory from [the standard Roaring on-disk
    /// format][format]. This is compatible with the official C/C++, Java and
    /// Go implementations. This method checks that all of the internal values
    /// are valid. If deserializing from a trusted source consider
    /// [Bitmap::deserialize_unchecked_from]
    ///
    /// [format]: https://github.com/RoaringBitmap/RoaringFormatSpec
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap;
    ///
    /// let rb1: Bitmap = (1..4).collect();
    /// let mut bytes = vec![];
    /// rb1.serialize_into(&mut bytes).unwrap();
    /// let rb2 = Bitmap::deserialize_from(&bytes[..]).unwrap();
    ///
    /// assert_eq!(rb1, rb2);
    /// ```
    pub fn deserialize_from<R: io::Read>(reader: R) -> io::Result<Bitmap> {
        let containers = deserialize_container_stream(reader, true)?;
        Ok(Bitmap::from_containers(containers))
    }

    /// Deserialize a bitmap into memory from [the standard Roaring on-disk
    /// format][format]. This is compatible with the official C/C++, Java and
    /// Go implementations. This method is memory safe but will not check if
    /// the data is a valid bitmap.
    ///
    /// [format]: https://github.com/RoaringBitmap/RoaringFormatSpec
    pub fn deserialize_unchecked_from<R: io::Read>(reader: R) -> io::Result<Bitmap> {
        let containers = deserialize_container_stream(reader, false)?;
        Ok(Bitmap::from_containers(containers))
    }
}
