use super::*;

fn pool(max: usize) -> PixelBufferPool {
    PixelBufferPool::new(PoolConfig {
        size: PixelSize::new(4, 2),
        format: PixelFormat::Argb8,
        max_buffers: max,
    })
    .unwrap()
}

#[test]
fn pool_hands_out_sized_buffers() {
    let p = pool(2);
    let b = p.try_acquire(PixelFormat::Argb8).unwrap();
    assert_eq!(b.bytes().len(), 4 * 2 * 4);
    assert_eq!(b.stride(), 16);
    assert_eq!(p.stats().outstanding, 1);
}

#[test]
fn pool_is_bounded() {
    let p = pool(2);
    let a = p.try_acquire(PixelFormat::Argb8).unwrap();
    let _b = p.try_acquire(PixelFormat::Argb8).unwrap();
    assert_eq!(
        p.try_acquire(PixelFormat::Argb8).unwrap_err(),
        AcquireError::Exhausted
    );
    drop(a);
    assert!(p.try_acquire(PixelFormat::Argb8).is_ok());
}

#[test]
fn dropped_buffers_are_reused_not_reallocated() {
    let p = pool(1);
    for _ in 0..10 {
        let b = p.try_acquire(PixelFormat::Argb8).unwrap();
        drop(b);
    }
    let st = p.stats();
    assert_eq!(st.allocated, 1);
    assert_eq!(st.outstanding, 0);
    assert_eq!(st.retained, 1);
}

#[test]
fn format_mismatch_is_reported_without_allocating() {
    let p = pool(1);
    assert!(matches!(
        p.try_acquire(PixelFormat::Rgba8),
        Err(AcquireError::FormatMismatch { .. })
    ));
    assert_eq!(p.stats().allocated, 0);
}

#[test]
fn buffers_return_from_other_threads() {
    let p = pool(1);
    let b = p.try_acquire(PixelFormat::Argb8).unwrap();
    std::thread::spawn(move || drop(b)).join().unwrap();
    assert_eq!(p.stats().outstanding, 0);
    assert!(p.try_acquire(PixelFormat::Argb8).is_ok());
}

#[test]
fn locked_rows_cover_one_stride() {
    let p = pool(1);
    let mut b = p.try_acquire(PixelFormat::Argb8).unwrap();
    {
        let mut px = b.lock();
        assert_eq!(px.height(), 2);
        px.row_mut(1).fill(7);
    }
    assert_eq!(&b.bytes()[..16], &[0u8; 16]);
    assert_eq!(&b.bytes()[16..], &[7u8; 16]);
}

#[test]
fn empty_or_zero_capacity_pools_are_rejected() {
    assert!(
        PixelBufferPool::new(PoolConfig {
            size: PixelSize::new(0, 2),
            format: PixelFormat::Argb8,
            max_buffers: 1,
        })
        .is_err()
    );
    assert!(
        PixelBufferPool::new(PoolConfig {
            size: PixelSize::new(2, 2),
            format: PixelFormat::Argb8,
            max_buffers: 0,
        })
        .is_err()
    );
}
