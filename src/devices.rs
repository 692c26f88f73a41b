//! Block device and partition enumeration.
//!
//! Used only to offer carving targets; carving itself never looks at
//! partition tables or filesystems.

use crate::utils::format_bytes;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceKind {
    Hdd,
    Ssd,
    NVMe,
    Usb,
    Unknown,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Hdd => write!(f, "HDD"),
            DeviceKind::Ssd => write!(f, "SSD"),
            DeviceKind::NVMe => write!(f, "NVMe"),
            DeviceKind::Usb => write!(f, "USB"),
            DeviceKind::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub mountpoint: Option<String>,
    pub fstype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDevice {
    pub name: String,
    pub kind: DeviceKind,
    pub size: u64,
    pub path: String,
    pub partitions: Vec<Partition>,
}

impl BlockDevice {
    pub fn size_human(&self) -> String {
        format_bytes(self.size)
    }
}

/// Lists the machine's block devices, sorted by name
pub fn discover_block_devices() -> Vec<BlockDevice> {
    #[cfg(target_os = "linux")]
    return linux::discover();

    #[cfg(not(target_os = "linux"))]
    return Vec::new();
}

/// Parses `/proc/mounts` style content into `(device, mountpoint, fstype)`
pub fn parse_mounts(content: &str) -> Vec<(String, String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mountpoint = fields.next()?;
            let fstype = fields.next()?;
            Some((
                device.to_string(),
                unescape_mount_field(mountpoint),
                fstype.to_string(),
            ))
        })
        .collect()
}

/// `/proc/mounts` escapes spaces and tabs as octal sequences
fn unescape_mount_field(field: &str) -> String {
    field
        .replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\134", "\\")
}

pub fn format_device_table(devices: &[BlockDevice]) -> String {
    let mut output = String::new();

    output.push_str("NAME         TYPE           SIZE  PATH / MOUNT\n");
    output.push_str("------------------------------------------------------------\n");

    for device in devices {
        output.push_str(&format!(
            "{:<12} {:<8} {:>12}  {}\n",
            device.name,
            device.kind.to_string(),
            device.size_human(),
            device.path
        ));
        for part in &device.partitions {
            output.push_str(&format!(
                "  {:<10} {:<8} {:>12}  {}\n",
                part.name,
                part.fstype.as_deref().unwrap_or("-"),
                format_bytes(part.size),
                part.mountpoint.as_deref().unwrap_or("[not mounted]")
            ));
        }
    }

    output
}

pub fn device_selection_options(devices: &[BlockDevice]) -> Vec<String> {
    devices
        .iter()
        .map(|d| format!("{} ({}) - {}", d.path, d.kind, d.size_human()))
        .collect()
}

#[cfg(target_os = "linux")]
mod linux {
    use super::{parse_mounts, BlockDevice, DeviceKind, Partition};
    use std::fs;
    use std::path::Path;

    const SECTOR: u64 = 512;

    pub(super) fn discover() -> Vec<BlockDevice> {
        let sys_block = Path::new("/sys/block");
        let Ok(entries) = fs::read_dir(sys_block) else {
            return Vec::new();
        };

        let mounts = fs::read_to_string("/proc/mounts")
            .map(|c| parse_mounts(&c))
            .unwrap_or_default();

        let mut devices: Vec<BlockDevice> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with("loop") || name.starts_with("ram") || name.starts_with("dm-") {
                    return None;
                }
                parse_device(&name, &mounts)
            })
            .collect();

        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    fn parse_device(name: &str, mounts: &[(String, String, String)]) -> Option<BlockDevice> {
        let sys_path = format!("/sys/block/{}", name);
        let size = read_sectors(&format!("{}/size", sys_path))? * SECTOR;
        if size == 0 {
            return None;
        }

        Some(BlockDevice {
            name: name.to_string(),
            kind: detect_kind(name, &sys_path),
            size,
            path: format!("/dev/{}", name),
            partitions: parse_partitions(name, &sys_path, mounts),
        })
    }

    fn parse_partitions(
        device: &str,
        sys_path: &str,
        mounts: &[(String, String, String)],
    ) -> Vec<Partition> {
        let Ok(entries) = fs::read_dir(sys_path) else {
            return Vec::new();
        };

        let mut partitions: Vec<Partition> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                if !name.starts_with(device) || !entry.path().join("partition").exists() {
                    return None;
                }
                let size = read_sectors(&format!("{}/{}/size", sys_path, name))? * SECTOR;
                let path = format!("/dev/{}", name);
                let mount = mounts.iter().find(|(dev, _, _)| *dev == path);
                Some(Partition {
                    name,
                    size,
                    mountpoint: mount.map(|(_, mp, _)| mp.clone()),
                    fstype: mount.map(|(_, _, fs)| fs.clone()),
                    path,
                })
            })
            .collect();

        partitions.sort_by(|a, b| a.name.cmp(&b.name));
        partitions
    }

    fn read_sectors(path: &str) -> Option<u64> {
        fs::read_to_string(path).ok()?.trim().parse::<u64>().ok()
    }

    fn detect_kind(name: &str, sys_path: &str) -> DeviceKind {
        if name.starts_with("nvme") {
            return DeviceKind::NVMe;
        }

        if let Ok(removable) = fs::read_to_string(format!("{}/removable", sys_path)) {
            if removable.trim() == "1" {
                return DeviceKind::Usb;
            }
        }

        match fs::read_to_string(format!("{}/queue/rotational", sys_path)) {
            Ok(r) if r.trim() == "1" => DeviceKind::Hdd,
            Ok(r) if r.trim() == "0" => DeviceKind::Ssd,
            _ => DeviceKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mounts() {
        let content = "/dev/sda1 / ext4 rw,relatime 0 0\n\
                       /dev/sdb1 /media/usb\\040stick vfat rw 0 0\n\
                       garbage\n";
        let mounts = parse_mounts(content);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0], ("/dev/sda1".into(), "/".into(), "ext4".into()));
        assert_eq!(mounts[1].1, "/media/usb stick");
    }

    #[test]
    fn test_format_device_table() {
        let devices = vec![BlockDevice {
            name: "sda".into(),
            kind: DeviceKind::Ssd,
            size: 512 * 1024 * 1024 * 1024,
            path: "/dev/sda".into(),
            partitions: vec![Partition {
                name: "sda1".into(),
                path: "/dev/sda1".into(),
                size: 1024 * 1024,
                mountpoint: None,
                fstype: None,
            }],
        }];
        let table = format_device_table(&devices);
        assert!(table.contains("sda"));
        assert!(table.contains("512.00 GB"));
        assert!(table.contains("[not mounted]"));
        assert_eq!(
            device_selection_options(&devices),
            vec!["/dev/sda (SSD) - 512.00 GB".to_string()]
        );
    }
}
