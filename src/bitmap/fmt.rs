use core::fmt;

use crate::Bitmap;

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.len() <= 16 {
            f.debug_set().entries(self.iter()).finish()
        } else {
            write!(
                f,
                "Bitmap<{} values in {} chunks, {}..={}>",
                self.len(),
                self.containers.len(),
                self.min().unwrap(),
                self.max().unwrap()
            )
        }
    }
}
