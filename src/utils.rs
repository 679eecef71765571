//! Utility functions

/// Group byte `k` of every `typesize`-byte element together.
///
/// Trailing bytes that do not form a whole element are copied unchanged.
pub fn shuffle_bytes(data: &[u8], typesize: usize) -> Vec<u8> {
    if typesize <= 1 {
        return data.to_vec();
    }

    let elements = data.len() / typesize;
    let body = elements * typesize;
    let mut out = vec![0u8; data.len()];

    for (i, element) in data[..body].chunks_exact(typesize).enumerate() {
        for (k, &byte) in element.iter().enumerate() {
            out[k * elements + i] = byte;
        }
    }
    out[body..].copy_from_slice(&data[body..]);

    out
}

/// Inverse of [`shuffle_bytes`]
pub fn unshuffle_bytes(data: &[u8], typesize: usize) -> Vec<u8> {
    if typesize <= 1 {
        return data.to_vec();
    }

    let elements = data.len() / typesize;
    let body = elements * typesize;
    let mut out = vec![0u8; data.len()];

    for (i, element) in out[..body].chunks_exact_mut(typesize).enumerate() {
        for (k, byte) in element.iter_mut().enumerate() {
            *byte = data[k * elements + i];
        }
    }
    out[body..].copy_from_slice(&data[body..]);

    out
}

/// Format byte size in human-readable form
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
