/// Optional priority carried by buffered items.
///
/// Higher values are more important. Items returning `None` are never chosen
/// as decimation victims by priority; they only leave the buffer through
/// plain oldest-first eviction.
pub trait PriorityHint {
    fn priority(&self) -> Option<u32> {
        None
    }
}

impl PriorityHint for f64 {}
impl PriorityHint for u64 {}
impl PriorityHint for String {}
impl PriorityHint for &'static str {}
