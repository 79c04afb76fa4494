//! Category derivation from setting names and help text.
//!
//! Pure function of (name, description) against a fixed keyword dictionary,
//! so the same inputs always land in the same categories across runs. A
//! setting may belong to several categories; a setting matching none falls
//! into [`Category::Other`].
//!
//! Matching is whole-word: the haystack is tokenized into lowercase
//! alphanumeric words and keywords are compared exactly. Substring matching
//! was rejected because short keywords ("ram", "fan") hit inside unrelated
//! words ("program", "infancy").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Cpu,
    Memory,
    Storage,
    Usb,
    Power,
    Security,
    Boot,
    Network,
    Graphics,
    Pci,
    Acpi,
    Virtualization,
    Other,
}

impl Category {
    /// All categories in display order. `Other` is last.
    pub const ALL: [Category; 13] = [
        Category::Cpu,
        Category::Memory,
        Category::Storage,
        Category::Usb,
        Category::Power,
        Category::Security,
        Category::Boot,
        Category::Network,
        Category::Graphics,
        Category::Pci,
        Category::Acpi,
        Category::Virtualization,
        Category::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Cpu => "CPU",
            Category::Memory => "Memory",
            Category::Storage => "Storage",
            Category::Usb => "USB",
            Category::Power => "Power",
            Category::Security => "Security",
            Category::Boot => "Boot",
            Category::Network => "Network",
            Category::Graphics => "Graphics",
            Category::Pci => "PCI",
            Category::Acpi => "ACPI",
            Category::Virtualization => "Virtualization",
            Category::Other => "Other",
        }
    }

    /// Case-insensitive lookup by display name (CLI filter flags).
    pub fn from_name(s: &str) -> Option<Category> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyword dictionary. Each word matches as a whole token only.
const KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Cpu,
        &["cpu", "processor", "turbo", "hyperthreading", "smt", "ratio", "microcode", "avx"],
    ),
    (
        Category::Memory,
        &["memory", "dram", "dimm", "xmp", "refresh", "scrub", "interleave", "ecc"],
    ),
    (
        Category::Storage,
        &["sata", "nvme", "raid", "ahci", "storage", "disk", "drive", "emmc"],
    ),
    (Category::Usb, &["usb", "xhci", "ehci", "port"]),
    (
        Category::Power,
        &["power", "sleep", "wake", "suspend", "cstate", "pstate", "battery", "thermal", "fan"],
    ),
    (
        Category::Security,
        &["security", "tpm", "secure", "password", "lock", "sgx", "txt", "encryption"],
    ),
    (Category::Boot, &["boot", "csm", "uefi", "legacy", "oprom", "post"]),
    (
        Category::Network,
        &["network", "lan", "ethernet", "wlan", "wifi", "bluetooth", "pxe"],
    ),
    (
        Category::Graphics,
        &["graphics", "video", "igpu", "gpu", "display", "hdmi", "vram"],
    ),
    (Category::Pci, &["pci", "pcie", "aspm", "lane", "slot"]),
    (Category::Acpi, &["acpi", "apic", "hpet", "smbus"]),
    (
        Category::Virtualization,
        &["virtualization", "vt", "vtd", "svm", "iommu", "sriov", "vmx"],
    ),
];

/// Derive the category set for one setting. Deterministic, no hidden state.
pub fn derive_categories(name: &str, description: &str) -> Vec<Category> {
    let mut words: Vec<String> = Vec::new();
    for source in [name, description] {
        for word in source
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            words.push(word.to_ascii_lowercase());
        }
    }

    let mut out = Vec::new();
    for (category, keywords) in KEYWORDS {
        if keywords.iter().any(|k| words.iter().any(|w| w == k)) {
            out.push(*category);
        }
    }
    if out.is_empty() {
        out.push(Category::Other);
    }
    out
}
