use crate::error::GoatM2mError;

/// RFC 3986 "unreserved"
fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

/// RFC 3986 "sub-delims"
fn is_sub_delim(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'='
    )
}

/// RFC 3986 "pchar", minus the escapes which are handled separately
pub fn is_pchar(byte: u8) -> bool {
    is_unreserved(byte) || is_sub_delim(byte) || byte == b':' || byte == b'@'
}

/// Query segments additionally allow `/` and `?`
pub fn is_query_char(byte: u8) -> bool {
    is_pchar(byte) || byte == b'/' || byte == b'?'
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Validates a chunk against `allowed` and resolves `%HH` escapes into the
/// returned storage. Chunks without a `%` skip straight to validation.
pub fn percent_decode(chunk: &str, allowed: fn(u8) -> bool) -> Result<String, GoatM2mError> {
    let bytes = chunk.as_bytes();
    if !bytes.contains(&b'%') {
        if let Some(bad) = bytes.iter().find(|byte| !allowed(**byte)) {
            return Err(GoatM2mError::UrlParse(format!(
                "invalid character {:?} in {chunk:?}",
                char::from(*bad)
            )));
        }
        return Ok(chunk.to_string());
    }

    let mut decoded: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        let byte = bytes[index];
        if byte == b'%' {
            let high = bytes.get(index + 1).copied().and_then(hex_value);
            let low = bytes.get(index + 2).copied().and_then(hex_value);
            match (high, low) {
                (Some(high), Some(low)) => decoded.push(high << 4 | low),
                _ => {
                    return Err(GoatM2mError::UrlParse(format!(
                        "invalid escape in {chunk:?}"
                    )));
                }
            }
            index += 3;
        } else if allowed(byte) {
            decoded.push(byte);
            index += 1;
        } else {
            return Err(GoatM2mError::UrlParse(format!(
                "invalid character {:?} in {chunk:?}",
                char::from(byte)
            )));
        }
    }

    String::from_utf8(decoded).map_err(|_| {
        GoatM2mError::UrlParse(format!("percent-decoded {chunk:?} is not valid UTF-8"))
    })
}

/// Escapes every byte `allowed` doesn't cover as `%HH`
pub fn percent_encode(input: &str, allowed: fn(u8) -> bool) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        if allowed(byte) && byte != b'%' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Ordered builder of owned strings with a hard item cap. A failed push
/// means the caller throws the whole list away.
#[derive(Debug)]
pub struct BoundedList {
    items: Vec<String>,
    max_items: usize,
}

impl BoundedList {
    pub fn new(max_items: usize) -> Self {
        BoundedList {
            items: Vec::new(),
            max_items,
        }
    }

    pub fn push(&mut self, value: String) -> Result<(), GoatM2mError> {
        if self.items.len() >= self.max_items {
            return Err(GoatM2mError::Resource(format!(
                "string list is full at {} items",
                self.max_items
            )));
        }
        self.items.push(value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.items
    }
}
