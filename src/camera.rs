use glam::{Mat4, Vec3, Vec4};

/// A perspective camera for 3D scenes.
///
/// Provides the view and projection transforms used by the scene and mask
/// passes, plus the two pieces of data the world-render pass needs to rebuild
/// world positions from depth: the camera-to-world matrix and the far-plane
/// corner rays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub fov: f32, // radians, vertical
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_2, // 90 degrees
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.forward = (target - self.position).normalize_or(Vec3::NEG_Z);
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Right vector from forward and up.
    ///
    /// When forward is parallel to up (looking straight down, say) any axis
    /// perpendicular to forward is used instead.
    pub fn right(&self) -> Vec3 {
        let forward = self.forward.normalize_or(Vec3::NEG_Z);
        forward
            .cross(self.up)
            .normalize_or(forward.any_orthonormal_vector())
    }

    /// Up recomputed to be orthogonal to forward and right.
    pub fn orthogonal_up(&self) -> Vec3 {
        self.right().cross(self.forward).normalize_or_zero()
    }

    /// World to view transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.orthogonal_up())
    }

    /// View to world transform.
    pub fn camera_to_world(&self) -> Mat4 {
        self.view_matrix().inverse()
    }

    /// View to clip transform with wgpu's [0, 1] depth range.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Projects a world point to normalized device coordinates.
    ///
    /// Returns `None` for points on or behind the camera plane, where the
    /// perspective divide is meaningless.
    pub fn project_to_ndc(&self, point: Vec3, aspect: f32) -> Option<Vec3> {
        let clip = self.view_projection(aspect) * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(clip.truncate() / clip.w)
    }

    /// World-space offsets from the camera to the four far-plane corners.
    ///
    /// Columns are bottom-left, bottom-right, top-right, top-left. Bilinearly
    /// interpolating them by screen UV gives the ray through a pixel, scaled so
    /// that `ray * (view_depth / far)` is the offset from the camera to the
    /// surface seen at that pixel.
    pub fn frustum_corners(&self, aspect: f32) -> Mat4 {
        let half_height = (self.fov * 0.5).tan() * self.far;
        let half_width = half_height * aspect;

        let center = self.forward.normalize_or(Vec3::NEG_Z) * self.far;
        let right = self.right() * half_width;
        let up = self.orthogonal_up() * half_height;

        let corner = |v: Vec3| Vec4::new(v.x, v.y, v.z, 0.0);
        Mat4::from_cols(
            corner(center - right - up),
            corner(center + right - up),
            corner(center + right + up),
            corner(center - right + up),
        )
    }

    /// Linear view-space depth for a stored depth-buffer value.
    pub fn linear_depth(&self, ndc_depth: f32) -> f32 {
        self.near * self.far / (self.far - ndc_depth * (self.far - self.near))
    }

    /// World-space ray through a point given in NDC (x right, y up).
    pub fn ray_through(&self, ndc: glam::Vec2, aspect: f32) -> (Vec3, Vec3) {
        let inverse = self.view_projection(aspect).inverse();
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        (near, (far - near).normalize_or(self.forward))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn origin_projects_to_center() {
        let camera = Camera::default();
        let ndc = camera.project_to_ndc(Vec3::ZERO, 1.0).unwrap();
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn points_behind_camera_have_no_ndc() {
        let camera = Camera::default();
        assert!(camera.project_to_ndc(Vec3::new(0.0, 0.0, 10.0), 1.0).is_none());
    }

    #[test]
    fn camera_to_world_inverts_view() {
        let camera = Camera::new()
            .at(Vec3::new(3.0, 2.0, 1.0))
            .looking_at(Vec3::new(0.0, 0.5, -4.0));
        let p = Vec3::new(0.25, -1.0, 2.0);
        let round_trip = camera
            .camera_to_world()
            .transform_point3(camera.view_matrix().transform_point3(p));
        assert!(approx(round_trip, p));
    }

    #[test]
    fn center_corner_ray_reconstructs_point() {
        let camera = Camera::default().with_clip(0.1, 50.0);
        let corners = camera.frustum_corners(1.5);

        // Center of the screen is the average of the four corners.
        let ray = (corners.x_axis + corners.y_axis + corners.z_axis + corners.w_axis) * 0.25;
        let target = Vec3::new(0.0, 0.0, -3.0);
        let depth = (camera.position - target).length();
        let world = camera.position + ray.truncate() * (depth / camera.far);
        assert!(approx(world, target));
    }

    #[test]
    fn corner_rays_hit_screen_corners() {
        let camera = Camera::default().with_clip(0.5, 20.0);
        let aspect = 16.0 / 9.0;
        let corners = camera.frustum_corners(aspect);

        let bottom_left = camera.position + corners.x_axis.truncate() * 0.5;
        let ndc = camera.project_to_ndc(bottom_left, aspect).unwrap();
        assert!((ndc.x + 1.0).abs() < 1e-3);
        assert!((ndc.y + 1.0).abs() < 1e-3);

        let top_right = camera.position + corners.z_axis.truncate() * 0.5;
        let ndc = camera.project_to_ndc(top_right, aspect).unwrap();
        assert!((ndc.x - 1.0).abs() < 1e-3);
        assert!((ndc.y - 1.0).abs() < 1e-3);
    }

    #[test]
    fn linear_depth_matches_projection() {
        let camera = Camera::default().with_clip(0.1, 100.0);
        let point = camera.position + camera.forward * 7.0;
        let ndc = camera.project_to_ndc(point, 1.0).unwrap();
        assert!((camera.linear_depth(ndc.z) - 7.0).abs() < 1e-2);
    }

    #[test]
    fn looking_straight_down_keeps_a_valid_basis() {
        let camera = Camera::new()
            .at(Vec3::new(0.0, 10.0, 0.0))
            .looking_at(Vec3::ZERO);

        let right = camera.right();
        assert!((right.length() - 1.0).abs() < 1e-5);
        assert!(right.dot(camera.forward).abs() < 1e-5);
        assert!(camera.view_matrix().is_finite());
        assert!(camera.frustum_corners(1.0).is_finite());

        let ndc = camera.project_to_ndc(Vec3::ZERO, 1.0).unwrap();
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn center_ray_follows_forward() {
        let camera = Camera::new()
            .at(Vec3::new(0.0, 4.0, 4.0))
            .looking_at(Vec3::ZERO);
        let (origin, dir) = camera.ray_through(Vec2::ZERO, 1.0);
        assert!(approx(dir, camera.forward));
        assert!((origin - camera.position).length() < camera.near * 2.0);
    }
}
