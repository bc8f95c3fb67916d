use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io;

use crate::bitmap::serialization::{
    deserialize_container_stream, serialize_container_stream, serialized_stream_size,
};
use crate::bitmap::store::Store;
use crate::bitmap64::util;
use crate::Bitmap64;

impl Bitmap64 {
    // The wire format groups chunks by the high 32 bits of their values:
    // one 32-bit portable bitmap per distinct prefix.
    fn sub_bitmaps(&self) -> Vec<(u32, Vec<(u16, &Store)>)> {
        let mut groups: Vec<(u32, Vec<(u16, &Store)>)> = Vec::new();
        for leaf in self.art().iter() {
            let prefix = (leaf.key >> 16) as u32;
            let entry = (leaf.key as u16, leaf.value.store());
            match groups.last_mut() {
                Some((last, stores)) if *last == prefix => stores.push(entry),
                _ => groups.push((prefix, vec![entry])),
            }
        }
        groups
    }

    /// Return the size in bytes of the serialized output.
    /// This is compatible with the official C/C++, Java and Go implementations.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let rb1 = Bitmap64::from([1, 2, 1 << 40]);
    /// let mut bytes = Vec::with_capacity(rb1.serialized_size());
    /// rb1.serialize_into(&mut bytes).unwrap();
    /// let rb2 = Bitmap64::deserialize_from(&bytes[..]).unwrap();
    ///
    /// assert_eq!(rb1, rb2);
    /// ```
    pub fn serialized_size(&self) -> usize {
        self.sub_bitmaps().into_iter().fold(8, |acc, (_, stores)| {
            acc + 4 + serialized_stream_size(stores.into_iter())
        })
    }

    /// Serialize this bitmap as a sequence of 32-bit portable bitmaps, one
    /// per distinct high 32 bits. This is compatible with the official
    /// C/C++, Java and Go implementations.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let rb1 = Bitmap64::from([1, 2, 1 << 40]);
    /// let mut bytes = vec![];
    /// rb1.serialize_into(&mut bytes).unwrap();
    /// let rb2 = Bitmap64::deserialize_from(&bytes[..]).unwrap();
    ///
    /// assert_eq!(rb1, rb2);
    /// ```
    pub fn serialize_into<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        let sub_bitmaps = self.sub_bitmaps();
        writer.write_u64::<LittleEndian>(sub_bitmaps.len() as u64)?;
        for (prefix, stores) in sub_bitmaps {
            writer.write_u32::<LittleEndian>(prefix)?;
            serialize_container_stream(stores.into_iter(), &mut writer)?;
        }
        Ok(())
    }

    /// Deserialize a bitmap into memory, validating every structural
    /// invariant of the stream.
    ///
    /// This is compatible with the official C/C++, Java and Go
    /// implementations.
    pub fn deserialize_from<R: io::Read>(reader: R) -> io::Result<Bitmap64> {
        Bitmap64::deserialize_from_impl(reader, true)
    }

    /// Deserialize a bitmap into memory without validating its contents.
    /// Memory safe for arbitrary input, but the bitmap is only usable if
    /// the input was a valid serialization.
    pub fn deserialize_unchecked_from<R: io::Read>(reader: R) -> io::Result<Bitmap64> {
        Bitmap64::deserialize_from_impl(reader, false)
    }

    fn deserialize_from_impl<R: io::Read>(mut reader: R, check: bool) -> io::Result<Bitmap64> {
        let n_sub_bitmaps = reader.read_u64::<LittleEndian>()?;

        let mut bitmap = Bitmap64::new();
        let mut prev_prefix = None;
        for _ in 0..n_sub_bitmaps {
            let prefix = reader.read_u32::<LittleEndian>()?;
            if check && prev_prefix.map_or(false, |prev| prev >= prefix) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "sub-bitmap prefixes are not strictly increasing",
                ));
            }
            prev_prefix = Some(prefix);

            let containers = deserialize_container_stream(&mut reader, check)?;
            for container in containers {
                let high = util::join(u64::from(prefix), container.key);
                bitmap.insert_container(high, container);
            }
        }
        Ok(bitmap)
    }
}

#[cfg(test)]
mod test {
    use crate::Bitmap64;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_serialization(
            bitmap in Bitmap64::arbitrary(),
        ) {
            let mut buffer = Vec::new();
            bitmap.serialize_into(&mut buffer).unwrap();
            prop_assert_eq!(buffer.len(), bitmap.serialized_size());
            prop_assert_eq!(&bitmap, &Bitmap64::deserialize_from(buffer.as_slice()).unwrap());
            prop_assert_eq!(&bitmap, &Bitmap64::deserialize_unchecked_from(buffer.as_slice()).unwrap());
        }
    }

    #[test]
    fn test_empty_bitmap_bytes() {
        let bitmap = Bitmap64::new();
        let mut buffer = Vec::new();
        bitmap.serialize_into(&mut buffer).unwrap();
        assert_eq!(buffer, [0u8; 8]);
        assert_eq!(bitmap.serialized_size(), 8);
        assert_eq!(Bitmap64::deserialize_from(buffer.as_slice()).unwrap(), bitmap);
    }

    #[test]
    fn test_known_bytes() {
        let bitmap = Bitmap64::from([3, 1 << 40]);
        let mut buffer = Vec::new();
        bitmap.serialize_into(&mut buffer).unwrap();
        let expected = [
            0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // two sub-bitmaps
            0x00, 0x00, 0x00, 0x00, // prefix 0
            0x3A, 0x30, 0x00, 0x00, // no-run cookie
            0x01, 0x00, 0x00, 0x00, // one container
            0x00, 0x00, 0x00, 0x00, // key 0, cardinality - 1 = 0
            0x10, 0x00, 0x00, 0x00, // payload offset
            0x03, 0x00, // the value 3
            0x00, 0x01, 0x00, 0x00, // prefix (1 << 40) >> 32 = 256
            0x3A, 0x30, 0x00, 0x00, // no-run cookie
            0x01, 0x00, 0x00, 0x00, // one container
            0x00, 0x00, 0x00, 0x00, // key 0, cardinality - 1 = 0
            0x10, 0x00, 0x00, 0x00, // payload offset
            0x00, 0x00, // the value 0
        ];
        assert_eq!(buffer, expected);
    }

    #[test]
    fn test_rejects_truncation() {
        let bitmap = Bitmap64::from([3, 1 << 40, u64::MAX]);
        let mut buffer = Vec::new();
        bitmap.serialize_into(&mut buffer).unwrap();
        for cut in [1, 7, 11, buffer.len() / 2, buffer.len() - 1] {
            assert!(Bitmap64::deserialize_from(&buffer[..cut]).is_err(), "cut {cut}");
        }
    }

    #[test]
    fn test_rejects_unordered_prefixes() {
        let bitmap = Bitmap64::from([3, 1 << 40]);
        let mut buffer = Vec::new();
        bitmap.serialize_into(&mut buffer).unwrap();
        // Rewrite the first prefix to be larger than the second.
        buffer[8..12].copy_from_slice(&0x200u32.to_le_bytes());
        assert!(Bitmap64::deserialize_from(buffer.as_slice()).is_err());
    }

    #[test]
    fn test_run_optimized_round_trip() {
        let mut bitmap = Bitmap64::new();
        bitmap.insert_range(0..200_000);
        bitmap.insert_range((1 << 40)..(1 << 40) + 50);
        bitmap.run_optimize();

        let mut buffer = Vec::new();
        bitmap.serialize_into(&mut buffer).unwrap();
        assert_eq!(buffer.len(), bitmap.serialized_size());
        let back = Bitmap64::deserialize_from(buffer.as_slice()).unwrap();
        assert_eq!(back, bitmap);
        back.internal_validate().unwrap();
    }
}
