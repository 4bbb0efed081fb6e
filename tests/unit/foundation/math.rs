use super::*;

#[test]
fn fnv_hash_is_stable_across_split_writes() {
    let mut a = Fnv1a64::new_default();
    a.write_bytes(b"flatview");
    let mut b = Fnv1a64::new_default();
    b.write_bytes(b"flat");
    b.write_bytes(b"view");
    assert_eq!(a.finish(), b.finish());
    assert_eq!(Fnv1a64::new_default().finish(), 0xcbf2_9ce4_8422_2325);

    let mut c = Fnv1a64::new_default();
    c.write_bytes(b"flatviews");
    assert_ne!(a.finish(), c.finish());
}

#[test]
fn mul_div255_variants_align() {
    for x in [0u16, 1, 127, 255] {
        for y in [0u16, 1, 127, 255] {
            assert_eq!(u16::from(mul_div255_u8(x, y)), mul_div255_u16(x, y));
        }
    }
}

#[test]
fn scale_extent_rounds_to_nearest() {
    assert_eq!(scale_extent(3840, 2.0), 1920);
    assert_eq!(scale_extent(1921, 2.0), 961);
    assert_eq!(scale_extent(1920, 1.0), 1920);
    assert_eq!(scale_extent(100, 3.0), 33);
}
