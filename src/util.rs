use std::hash::Hasher;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use twox_hash::XxHash64;

pub fn create_thread_pool<T>() -> (Arc<ThreadPool>, Sender<T>, Receiver<T>) {
    let pool = Arc::new(ThreadPoolBuilder::new().build().unwrap());
    let (rs, rr) = channel();
    (pool, rs, rr)
}

pub fn content_hash(content: &str) -> u64 {
    let mut hasher: XxHash64 = Default::default();
    hasher.write(content.as_bytes());
    hasher.finish()
}
