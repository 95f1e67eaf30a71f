//! Per-object overlay eligibility.

use glam::Vec3;

use crate::camera::Camera;
use crate::config::VisibilityTest;

/// Decides whether an object is redrawn into the scan mask this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibilityGate {
    test: VisibilityTest,
}

impl VisibilityGate {
    pub fn new(test: VisibilityTest) -> Self {
        Self { test }
    }

    pub fn test(&self) -> VisibilityTest {
        self.test
    }

    /// Nothing passes while the overlay is not displaying. Otherwise, with
    /// [`VisibilityTest::Frustum`], the object's reference point must land
    /// inside [-1, 1] on every NDC axis. An object without a reference point
    /// cannot be tested and is accepted.
    pub fn should_overlay(
        &self,
        position: Option<Vec3>,
        is_displaying: bool,
        camera: &Camera,
        aspect: f32,
    ) -> bool {
        if !is_displaying {
            return false;
        }

        match (self.test, position) {
            (VisibilityTest::Always, _) | (_, None) => true,
            (VisibilityTest::Frustum, Some(position)) => camera
                .project_to_ndc(position, aspect)
                .is_some_and(inside_ndc),
        }
    }
}

fn inside_ndc(ndc: Vec3) -> bool {
    ndc.abs().cmple(Vec3::ONE).all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_passes_when_not_displaying() {
        let camera = Camera::default();
        for test in [VisibilityTest::Always, VisibilityTest::Frustum] {
            let gate = VisibilityGate::new(test);
            assert!(!gate.should_overlay(Some(Vec3::ZERO), false, &camera, 1.0));
            assert!(!gate.should_overlay(None, false, &camera, 1.0));
        }
    }

    #[test]
    fn always_accepts_everything_while_displaying() {
        let camera = Camera::default();
        let gate = VisibilityGate::new(VisibilityTest::Always);
        assert!(gate.should_overlay(Some(Vec3::new(0.0, 0.0, 50.0)), true, &camera, 1.0));
        assert!(gate.should_overlay(None, true, &camera, 1.0));
    }

    #[test]
    fn frustum_accepts_point_in_view() {
        let camera = Camera::default();
        let gate = VisibilityGate::new(VisibilityTest::Frustum);
        assert!(gate.should_overlay(Some(Vec3::ZERO), true, &camera, 1.0));
    }

    #[test]
    fn frustum_rejects_point_off_screen() {
        // 90 degree fov, camera at z = 5: x = 7.5 at z = 0 projects to ndc.x = 1.5.
        let camera = Camera::default();
        let gate = VisibilityGate::new(VisibilityTest::Frustum);
        let point = Vec3::new(7.5, 0.0, 0.0);

        let ndc = camera.project_to_ndc(point, 1.0).unwrap();
        assert!((ndc.x - 1.5).abs() < 1e-4);
        assert!(!gate.should_overlay(Some(point), true, &camera, 1.0));
    }

    #[test]
    fn frustum_rejects_point_behind_camera() {
        let camera = Camera::default();
        let gate = VisibilityGate::new(VisibilityTest::Frustum);
        assert!(!gate.should_overlay(Some(Vec3::new(0.0, 0.0, 6.0)), true, &camera, 1.0));
    }

    #[test]
    fn frustum_rejects_point_past_far_plane() {
        let camera = Camera::default().with_clip(0.1, 10.0);
        let gate = VisibilityGate::new(VisibilityTest::Frustum);
        assert!(!gate.should_overlay(Some(Vec3::new(0.0, 0.0, -20.0)), true, &camera, 1.0));
    }

    #[test]
    fn ndc_bounds_are_inclusive() {
        assert!(inside_ndc(Vec3::new(1.0, -1.0, 1.0)));
        assert!(!inside_ndc(Vec3::new(1.5, 0.0, 0.0)));
        assert!(!inside_ndc(Vec3::new(0.0, 0.0, -1.01)));
    }
}
