//! RESP command serializer.
//!
//! Every request is an array of bulk strings:
//! `*<N>\r\n$<len>\r\narg1\r\n$<len>\r\narg2\r\n…`

use bytes::{BufMut, Bytes, BytesMut};
use itoa::Buffer;

/// Worst-case header size for one `$<len>\r\n` or `*<N>\r\n` line.
const HEADER_MAX: usize = 1 + 20 + 2;

fn encoded_len<T: AsRef<[u8]>>(tokens: &[T]) -> usize {
    HEADER_MAX
        + tokens
            .iter()
            .map(|t| HEADER_MAX + t.as_ref().len() + 2)
            .sum::<usize>()
}

/// Append one command to `buf`. Tokens are written as-is (binary safe).
pub fn write_command<T: AsRef<[u8]>>(buf: &mut BytesMut, tokens: &[T]) {
    let mut itoa_buf = Buffer::new();
    buf.reserve(encoded_len(tokens));

    buf.put_u8(b'*');
    buf.put_slice(itoa_buf.format(tokens.len()).as_bytes());
    buf.put_slice(b"\r\n");

    for token in tokens {
        let token = token.as_ref();
        buf.put_u8(b'$');
        buf.put_slice(itoa_buf.format(token.len()).as_bytes());
        buf.put_slice(b"\r\n");
        buf.put_slice(token);
        buf.put_slice(b"\r\n");
    }
}

/// Encode one command into a fresh buffer.
///
/// ```
/// use rsedis::resp::encode_command;
/// let wire = encode_command(&["SET", "key", "value"]);
/// assert_eq!(&wire[..], b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n");
/// ```
pub fn encode_command<T: AsRef<[u8]>>(tokens: &[T]) -> Bytes {
    let mut buf = BytesMut::new();
    write_command(&mut buf, tokens);
    buf.freeze()
}

/// Encode several commands back to back so the batch goes out in one write.
pub fn encode_pipeline<C, T>(commands: &[C]) -> Bytes
where
    C: AsRef<[T]>,
    T: AsRef<[u8]>,
{
    let cap = commands.iter().map(|c| encoded_len(c.as_ref())).sum();
    let mut buf = BytesMut::with_capacity(cap);
    for cmd in commands {
        write_command(&mut buf, cmd.as_ref());
    }
    buf.freeze()
}

// ── Tests ──────────────────────────────────────────────────────────
