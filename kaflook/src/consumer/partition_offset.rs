use getset::CopyGetters;

/// Position of a message inside its topic.
#[derive(Debug, CopyGetters, Copy, Clone, PartialEq, Eq, Hash)]
#[getset(get_copy = "pub")]
pub struct PartitionOffset {
    partition: i32,
    offset: i64,
}

impl PartitionOffset {
    pub fn new(partition: i32, offset: i64) -> PartitionOffset {
        Self { offset, partition }
    }
}
