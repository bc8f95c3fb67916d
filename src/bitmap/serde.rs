use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::serde_support::PortableBytes;
use crate::Bitmap;

impl Serialize for Bitmap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut bytes = Vec::with_capacity(self.serialized_size());
        self.serialize_into(&mut bytes).map_err(serde::ser::Error::custom)?;
        serializer.serialize_bytes(&bytes)
    }
}

impl<'de> Deserialize<'de> for Bitmap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let PortableBytes(bytes) = PortableBytes::deserialize(deserializer)?;
        Bitmap::deserialize_from(bytes.as_slice()).map_err(serde::de::Error::custom)
    }
}
