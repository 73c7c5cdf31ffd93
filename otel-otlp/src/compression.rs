//! Body/frame compression (spec.md §6): none or gzip.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

impl Compression {
    pub fn as_content_encoding(self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some("gzip"),
        }
    }
}

#[cfg(feature = "gzip-http")]
pub fn gzip_encode(body: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::GzEncoder;
    use flate2::Compression as FlateLevel;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), FlateLevel::default());
    encoder.write_all(body)?;
    encoder.finish()
}

#[cfg(feature = "grpc-tonic")]
pub fn tonic_encoding(compression: Compression) -> Option<tonic::codec::CompressionEncoding> {
    match compression {
        Compression::None => None,
        Compression::Gzip => Some(tonic::codec::CompressionEncoding::Gzip),
    }
}
