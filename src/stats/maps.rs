/// Size figures of one named BPF map.
///
/// `memlock` is the locked memory the kernel charges for the map, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapStats {
    pub name: String,
    pub key_size: u64,
    pub value_size: u64,
    pub max_entries: u64,
    pub memlock: u64,
}

impl MapStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn key_size(mut self, key_size: u64) -> Self {
        self.key_size = key_size;
        self
    }

    pub fn value_size(mut self, value_size: u64) -> Self {
        self.value_size = value_size;
        self
    }

    pub fn max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn memlock(mut self, memlock: u64) -> Self {
        self.memlock = memlock;
        self
    }
}
