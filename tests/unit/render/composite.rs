use super::*;

#[test]
fn transparent_src_is_noop() {
    let dst = [10, 20, 30, 255];
    assert_eq!(over(dst, [255, 255, 255, 0]), dst);
}

#[test]
fn opaque_src_replaces_dst() {
    assert_eq!(over([0, 0, 0, 255], [255, 0, 0, 255]), [255, 0, 0, 255]);
}

#[test]
fn half_white_over_black_is_mid_gray_and_opaque() {
    let out = over([0, 0, 0, 255], [128, 128, 128, 128]);
    assert_eq!(out, [128, 128, 128, 255]);
}

#[test]
fn in_place_blend_checks_lengths() {
    let mut dst = vec![0u8; 8];
    assert!(over_in_place(&mut dst, &[0u8; 4]).is_err());
}

#[test]
fn in_place_blend_only_touches_covered_pixels() {
    let mut dst = vec![1, 2, 3, 255, 4, 5, 6, 255];
    let src = vec![0, 0, 0, 0, 200, 100, 50, 255];
    over_in_place(&mut dst, &src).unwrap();
    assert_eq!(dst, vec![1, 2, 3, 255, 200, 100, 50, 255]);
}
