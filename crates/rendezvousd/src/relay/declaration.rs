//! Reading the one-line relay declaration.

use tokio::io::{AsyncRead, AsyncReadExt};

use rendezvous_core::wire::{parse_declaration, LINE_TERMINATOR};
use rendezvous_core::{DeclarationError, RelayDeclaration};

/// Read until the first line terminator and parse the declaration.
///
/// Returns the declaration and any bytes that followed the terminator in the
/// same reads; those belong to the relayed stream.
pub async fn read_declaration<R>(
    reader: &mut R,
    max_len: usize,
) -> Result<(RelayDeclaration, Vec<u8>), DeclarationError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(256);
    let mut chunk = [0u8; 1024];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(DeclarationError::Incomplete);
        }

        let scanned = buf.len();
        buf.extend_from_slice(&chunk[..n]);

        if let Some(offset) = buf[scanned..].iter().position(|b| *b == LINE_TERMINATOR) {
            let end = scanned + offset;
            let rest = buf.split_off(end + 1);
            buf.truncate(end);
            return parse_declaration(&buf).map(|decl| (decl, rest));
        }

        if buf.len() > max_len {
            return Err(DeclarationError::TooLong(max_len));
        }
    }
}
