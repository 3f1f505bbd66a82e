use bytes::Bytes;
use std::fmt;
use std::io::{self, Cursor, Read};

/// A single-read HTTP body.
///
/// Reading consumes the stream. Use [`Body::duplicate`] to get a second reader
/// without losing the first one.
pub struct Body {
    reader: Option<Box<dyn Read + Send>>,
}

impl Body {
    /// A message without a body
    pub fn empty() -> Self {
        Self { reader: None }
    }

    /// Wrap any reader as a body stream
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            reader: Some(Box::new(reader)),
        }
    }

    /// true when the message carries no body at all
    pub fn is_absent(&self) -> bool {
        self.reader.is_none()
    }

    /// Read the rest of the stream into memory and put a fresh reader over
    /// the same bytes back in place.
    ///
    /// On error the body is left partially consumed and should not be trusted.
    pub fn drain(&mut self) -> io::Result<Bytes> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(Bytes::new()),
        };

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let bytes = Bytes::from(buf);
        self.reader = Some(Box::new(Cursor::new(bytes.clone())));
        Ok(bytes)
    }

    /// Get an independent copy of this body, leaving this one readable from
    /// the start of what was left unread.
    pub fn duplicate(&mut self) -> io::Result<Body> {
        if self.is_absent() {
            return Ok(Body::empty());
        }
        Ok(Body::from(self.drain()?))
    }

    /// Consume the body into memory
    pub fn into_bytes(mut self) -> io::Result<Bytes> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reader.as_mut() {
            Some(reader) => reader.read(buf),
            None => Ok(0),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("absent", &self.is_absent())
            .finish_non_exhaustive()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl From<Vec<u8>> for Body {
    fn from(buf: Vec<u8>) -> Self {
        Self::from(Bytes::from(buf))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}
