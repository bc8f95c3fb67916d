//! Shared plumbing for the serde encodings.
//!
//! Both bitmap types travel as their portable byte form. Formats disagree
//! on how they hand bytes back when deserializing (a borrowed slice, an
//! owned buffer, or a sequence of integers), so one buffer type absorbs
//! all three shapes and the per-type impls only decode.

use core::fmt;
use serde::de::{Error, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

pub(crate) struct PortableBytes(pub Vec<u8>);

impl<'de> Deserialize<'de> for PortableBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BytesVisitor;

        impl<'de> Visitor<'de> for BytesVisitor {
            type Value = PortableBytes;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a portable bitmap byte buffer")
            }

            fn visit_bytes<E: Error>(self, bytes: &[u8]) -> Result<PortableBytes, E> {
                Ok(PortableBytes(bytes.to_vec()))
            }

            fn visit_byte_buf<E: Error>(self, bytes: Vec<u8>) -> Result<PortableBytes, E> {
                Ok(PortableBytes(bytes))
            }

            // Human-readable formats tend to lower bytes to a sequence of
            // integers.
            fn visit_seq<A>(self, mut seq: A) -> Result<PortableBytes, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(byte) = seq.next_element()? {
                    bytes.push(byte);
                }
                Ok(PortableBytes(bytes))
            }
        }

        deserializer.deserialize_bytes(BytesVisitor)
    }
}
