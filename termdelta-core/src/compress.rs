use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::{Error, Result};

pub fn compress(data: &[u8]) -> Vec<u8> {
    compress_prepend_size(data)
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    decompress_size_prepended(data).map_err(|e| Error::Decompress(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_a_decompress_error() {
        let packed = compress(b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        assert_eq!(decompress(&packed).unwrap(), b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        // too short to hold the size prefix
        assert!(matches!(decompress(&[1, 2]), Err(Error::Decompress(_))));
    }
}
