use core::fmt;

use crate::Bitmap64;

impl fmt::Debug for Bitmap64 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.len() <= 16 {
            f.debug_set().entries(self.iter()).finish()
        } else {
            write!(
                f,
                "Bitmap64<{} values in {} chunks, {}..={}>",
                self.len(),
                self.art().len(),
                self.min().unwrap(),
                self.max().unwrap()
            )
        }
    }
}
