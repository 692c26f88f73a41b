const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;
const PB: u64 = TB * 1024;

/// Human-readable byte count, e.g. `1.50 MB`
pub fn format_bytes(size: u64) -> String {
    let (unit, scale) = match size {
        s if s >= PB => ("PB", PB),
        s if s >= TB => ("TB", TB),
        s if s >= GB => ("GB", GB),
        s if s >= MB => ("MB", MB),
        s if s >= KB => ("KB", KB),
        _ => return format!("{size} B"),
    };
    format!("{:.2} {}", size as f64 / scale as f64, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
