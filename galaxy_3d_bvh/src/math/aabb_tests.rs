use glam::{Mat4, Vec3};
use super::*;

fn make_aabb(min: Vec3, max: Vec3) -> AABB {
    AABB { min, max }
}

// ============================================================================
// Construction and accessors
// ============================================================================

#[test]
fn test_from_center_size_matches_corners() {
    let aabb = AABB::from_center_size(Vec3::new(10.0, 0.0, 0.0), Vec3::ONE);
    assert_eq!(aabb.min, Vec3::new(9.5, -0.5, -0.5));
    assert_eq!(aabb.max, Vec3::new(10.5, 0.5, 0.5));
    assert_eq!(aabb.center(), Vec3::new(10.0, 0.0, 0.0));
    assert_eq!(aabb.half_extent(), Vec3::splat(0.5));
    assert_eq!(aabb.size(), Vec3::ONE);
}

#[test]
fn test_negative_half_extent_is_absolute() {
    let aabb = AABB::from_center_half_extent(Vec3::ZERO, Vec3::new(-1.0, 2.0, -3.0));
    assert_eq!(aabb.half_extent(), Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_normalized_swaps_inverted_axes() {
    let inverted = make_aabb(Vec3::new(1.0, 0.0, 5.0), Vec3::new(-1.0, 2.0, 4.0));
    let n = inverted.normalized();
    assert_eq!(n.min, Vec3::new(-1.0, 0.0, 4.0));
    assert_eq!(n.max, Vec3::new(1.0, 2.0, 5.0));
}

// ============================================================================
// Union / containment
// ============================================================================

#[test]
fn test_union_encloses_both() {
    let a = AABB::from_center_size(Vec3::ZERO, Vec3::ONE);
    let b = AABB::from_center_size(Vec3::new(10.0, 0.0, 0.0), Vec3::ONE);
    let u = a.union(&b);

    assert_eq!(u.min.x, -0.5);
    assert_eq!(u.max.x, 10.5);
    assert!(u.contains(&a));
    assert!(u.contains(&b));
}

#[test]
fn test_aabb_contains() {
    let big = make_aabb(Vec3::splat(-10.0), Vec3::splat(10.0));
    let small = make_aabb(Vec3::splat(-1.0), Vec3::splat(1.0));
    let straddling = make_aabb(Vec3::new(5.0, 5.0, 5.0), Vec3::new(15.0, 15.0, 15.0));

    assert!(big.contains(&small));
    assert!(!small.contains(&big));
    assert!(!big.contains(&straddling));
    assert!(big.contains(&big));
}

#[test]
fn test_aabb_contains_point() {
    let aabb = make_aabb(Vec3::ZERO, Vec3::ONE);
    assert!(aabb.contains_point(Vec3::splat(0.5)));
    assert!(aabb.contains_point(Vec3::ONE));
    assert!(!aabb.contains_point(Vec3::new(1.5, 0.5, 0.5)));
}

// ============================================================================
// Surface area
// ============================================================================

#[test]
fn test_surface_area_unit_cube() {
    let cube = AABB::from_center_size(Vec3::ZERO, Vec3::ONE);
    assert_eq!(cube.surface_area(), 6.0);
}

#[test]
fn test_surface_area_flat_box() {
    let flat = AABB::from_center_size(Vec3::ZERO, Vec3::new(2.0, 3.0, 0.0));
    assert_eq!(flat.surface_area(), 12.0);
}

#[test]
fn test_union_surface_area() {
    let a = AABB::from_center_size(Vec3::ZERO, Vec3::ONE);
    let b = AABB::from_center_size(Vec3::new(1.0, 0.0, 0.0), Vec3::ONE);
    // Union is 2 x 1 x 1
    assert_eq!(a.union_surface_area(&b), 10.0);
}

// ============================================================================
// Padding / scaling
// ============================================================================

#[test]
fn test_padded_grows_size() {
    let aabb = AABB::from_center_size(Vec3::ZERO, Vec3::ONE);
    let padded = aabb.padded(0.01);
    assert!(padded.size().abs_diff_eq(Vec3::splat(1.01), 1e-6));
    assert_eq!(padded.center(), Vec3::ZERO);
}

#[test]
fn test_padded_degenerate_box_has_volume() {
    let point = make_aabb(Vec3::splat(3.0), Vec3::splat(3.0));
    let padded = point.padded(0.01);
    assert!(padded.size().cmpgt(Vec3::ZERO).all());
    assert!(padded.contains_point(Vec3::splat(3.0)));
}

#[test]
fn test_padded_inverted_box_is_normalized() {
    let inverted = make_aabb(Vec3::splat(1.0), Vec3::splat(-1.0));
    let padded = inverted.padded(0.0);
    assert_eq!(padded.min, Vec3::splat(-1.0));
    assert_eq!(padded.max, Vec3::splat(1.0));
}

#[test]
fn test_scaled_about_center() {
    let aabb = AABB::from_center_size(Vec3::new(2.0, 2.0, 2.0), Vec3::splat(2.0));
    let scaled = aabb.scaled(2.0);
    assert_eq!(scaled.center(), Vec3::new(2.0, 2.0, 2.0));
    assert_eq!(scaled.size(), Vec3::splat(4.0));
}

#[test]
fn test_approx_eq() {
    let a = AABB::from_center_size(Vec3::ZERO, Vec3::ONE);
    let b = AABB::from_center_size(Vec3::splat(1e-4), Vec3::ONE);
    assert!(a.approx_eq(&b, 1e-3));
    assert!(!a.approx_eq(&b, 1e-5));
}

// ============================================================================
// Transform
// ============================================================================

#[test]
fn test_transformed_translation() {
    let aabb = make_aabb(Vec3::splat(-1.0), Vec3::splat(1.0));
    let moved = aabb.transformed(&Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
    assert_eq!(moved.min, Vec3::new(4.0, -1.0, -1.0));
    assert_eq!(moved.max, Vec3::new(6.0, 1.0, 1.0));
}

#[test]
fn test_transformed_rotation_stays_tight() {
    let aabb = make_aabb(Vec3::new(0.0, -1.0, -1.0), Vec3::new(2.0, 1.0, 1.0));
    let rotated = aabb.transformed(&Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2));
    // 90° about Z: x in [0,2] becomes y in [0,2]
    assert!(rotated.min.abs_diff_eq(Vec3::new(-1.0, 0.0, -1.0), 1e-5));
    assert!(rotated.max.abs_diff_eq(Vec3::new(1.0, 2.0, 1.0), 1e-5));
}
