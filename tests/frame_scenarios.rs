//! Whole-frame scenarios driven through the public `Renderer` API.

use glam::{IVec2, ivec2, ivec3};

use fixraster::{
    math::{DEPTH_CLEAR, DEPTH_UNIT, FAR_PLANE},
    renderer::{
        DrawCall, Renderer, RendererExt, WallTexture,
        software::{Viewport, ViewportConfig},
    },
    world::{Bitmap, Camera, Facing, Panorama, Patch, PatchGrid, PositionMatrix, WallSurface},
};

fn viewport() -> Viewport {
    let mut vp = Viewport::new(ViewportConfig::default()).unwrap();
    vp.set_camera(Camera::new(ivec3(0, 0, 0), 0));
    vp.begin_frame();
    vp
}

/// Wall facing the eye at `depth`, spanning the same screen band at any
/// depth: 2 m at 2000 mm projects to columns 120..200.
fn centered_wall(depth: i32) -> WallSurface {
    let half = depth / 4;
    WallSurface::new(ivec3(depth, half, half), ivec3(depth, -half, -half))
}

fn floor_ring(near: i32, far: i32, half_width: i32) -> [IVec2; 4] {
    [
        ivec2(far, half_width),
        ivec2(far, -half_width),
        ivec2(near, -half_width),
        ivec2(near, half_width),
    ]
}

#[test]
fn farther_wall_loses_to_nearer_band() {
    let mut vp = viewport();
    let near_bmp = Bitmap::plain(1_000, 1_000, 7).unwrap();
    let far_bmp = Bitmap::plain(1_000, 1_000, 9).unwrap();
    let near_plane = vp.config().plane_dist;

    vp.draw_wall(&centered_wall(2 * near_plane), &WallTexture::single(&near_bmp));
    let color_before = vp.color().to_vec();
    let depth_before = vp.depth().to_vec();

    let z = (2 * near_plane / DEPTH_UNIT) as u16;
    assert_eq!(vp.pixel(160, 120), 7);
    assert_eq!(vp.depth_at(160, 120), z);
    assert_eq!(vp.depth_at(130, 90), z);

    vp.draw_wall(&centered_wall(4 * near_plane), &WallTexture::single(&far_bmp));
    for (i, (&c, &d)) in color_before.iter().zip(&depth_before).enumerate() {
        if d != DEPTH_CLEAR {
            assert_eq!(vp.color()[i], c, "pixel {i} overwritten by farther wall");
            assert_eq!(vp.depth()[i], d);
        }
    }
}

#[test]
fn wall_beyond_far_plane_is_noop() {
    let mut vp = viewport();
    let bmp = Bitmap::plain(1_000, 1_000, 7).unwrap();
    let depth = FAR_PLANE + 10_000;
    let wall = WallSurface::new(ivec3(depth, 5_000, 500), ivec3(depth, -5_000, -500));
    vp.draw_wall(&wall, &WallTexture::single(&bmp));
    assert!(vp.depth().iter().all(|&z| z == DEPTH_CLEAR));
    assert!(vp.color().iter().all(|&c| c == 0));
}

#[test]
fn depth_never_increases_across_draw_calls() {
    let mut vp = viewport();
    vp.set_camera(Camera::new(ivec3(0, 0, 1_000), 0));
    vp.begin_frame();

    let plain = Bitmap::plain(1_000, 1_000, 3).unwrap();
    let checker = Bitmap::checker(1_000, 1_000, 32, 4, 10, 20).unwrap();
    let ring = floor_ring(1_500, 9_000, 3_000);
    let patch = PatchGrid::from_fn(
        4,
        4,
        ivec3(2_500, -1_500, 0),
        ivec2(0, 1_000),
        ivec2(1_000, 0),
        |u, v| (u * v) as i32 * 150,
    );
    let walls = [
        WallSurface::new(ivec3(5_000, 1_500, 2_000), ivec3(5_000, -1_500, 0)),
        WallSurface::new(ivec3(3_000, 3_000, 1_500), ivec3(7_000, 500, 0)),
    ];

    let mut prev = vp.depth().to_vec();
    let mut check = |vp: &Viewport| {
        for (i, (&now, &before)) in vp.depth().iter().zip(&prev).enumerate() {
            assert!(now <= before, "depth at {i} grew from {before} to {now}");
        }
        prev = vp.depth().to_vec();
    };

    vp.draw_wall(&walls[0], &WallTexture::single(&checker));
    check(&vp);
    vp.draw_horizontal_surface(&ring, 0, Facing::Up, &plain);
    check(&vp);
    vp.draw_patch(&patch, &PositionMatrix::default(), &checker);
    check(&vp);
    vp.draw_wall(&walls[1], &WallTexture::single(&plain));
    check(&vp);
    vp.draw_horizontal_surface(&ring, 0, Facing::Up, &checker);
    check(&vp);
}

#[test]
fn wall_hides_floor_behind_it_in_any_order() {
    let floor = Bitmap::plain(1_000, 1_000, 4).unwrap();
    let wall_bmp = Bitmap::plain(1_000, 1_000, 8).unwrap();
    let ring = floor_ring(1_500, 12_000, 4_000);
    // 2 m tall wall standing on the floor, eye at 1 m
    let wall = WallSurface::new(ivec3(4_000, 2_000, 2_000), ivec3(4_000, -2_000, 0));

    let render = |wall_first: bool| {
        let mut vp = viewport();
        vp.set_camera(Camera::new(ivec3(0, 0, 1_000), 0));
        vp.begin_frame();
        if wall_first {
            vp.draw_wall(&wall, &WallTexture::single(&wall_bmp));
            vp.draw_horizontal_surface(&ring, 0, Facing::Up, &floor);
        } else {
            vp.draw_horizontal_surface(&ring, 0, Facing::Up, &floor);
            vp.draw_wall(&wall, &WallTexture::single(&wall_bmp));
        }
        vp.color().to_vec()
    };

    let a = render(true);
    let b = render(false);
    // wall base sits on the floor at row 160; the wall covers rows 80..160
    let at = |buf: &[u8], x: usize, y: usize| buf[y * 320 + x];
    assert_eq!(at(&a, 160, 150), 8);
    assert_eq!(at(&b, 160, 150), 8);
    assert_eq!(at(&a, 160, 200), 4);
    assert_eq!(at(&b, 160, 200), 4);
}

#[test]
fn draw_frame_runs_every_call_and_submits_once() {
    let mut vp = viewport();
    vp.set_camera(Camera::new(ivec3(0, 0, 1_000), 0));
    let sky = Panorama::from_fn(256, 64, |_, _| 200).unwrap();
    let floor = Bitmap::plain(1_000, 1_000, 4).unwrap();
    let wall_bmp = Bitmap::plain(1_000, 1_000, 8).unwrap();
    let ring = floor_ring(1_500, 12_000, 4_000);
    let patch = PatchGrid::from_fn(
        2,
        2,
        ivec3(2_000, -500, 200),
        ivec2(0, 1_000),
        ivec2(500, 0),
        |_, _| 0,
    );

    let calls = [
        DrawCall::Background(&sky),
        DrawCall::Wall {
            wall: WallSurface::new(ivec3(6_000, 3_000, 2_500), ivec3(6_000, -3_000, 0)),
            texture: WallTexture::single(&wall_bmp),
        },
        DrawCall::HorizontalSurface {
            ring: &ring,
            level: 0,
            facing: Facing::Up,
            bitmap: &floor,
        },
        DrawCall::Patch {
            patch: &patch,
            matrix: PositionMatrix::default(),
            bitmap: &wall_bmp,
        },
    ];

    let mut submitted = 0;
    let mut seen = Vec::new();
    vp.draw_frame(&calls, |color, depth, w, h| {
        submitted += 1;
        assert_eq!((w, h), (320, 240));
        assert_eq!(depth.len(), w * h);
        seen = color.to_vec();
    });
    assert_eq!(submitted, 1);
    // sky above the wall, wall in the middle, floor near the bottom
    assert_eq!(seen[5 * 320 + 160], 200);
    assert_eq!(seen[110 * 320 + 160], 8);
    assert_eq!(seen[220 * 320 + 20], 4);
}

#[test]
fn patch_quads_and_near_corner() {
    let vp = viewport();
    let bmp = Bitmap::plain(1_000, 1_000, 3).unwrap();
    let quad = PatchGrid::from_fn(
        2,
        2,
        ivec3(2_000, -1_000, -800),
        ivec2(0, 2_000),
        ivec2(3_000, 0),
        |_, _| 0,
    );
    assert_eq!(vp.patch_triangles(&quad, &PositionMatrix::default(), &bmp).len(), 2);

    let grid = PatchGrid::from_fn(
        3,
        3,
        ivec3(2_000, -1_000, -800),
        ivec2(0, 1_000),
        ivec2(1_500, 0),
        |_, _| 0,
    );
    let mut nodes = grid.nodes().to_vec();
    // node 8 is the far corner of the opposite quad: pull it behind the eye
    nodes[8].x = -3_000;
    let grid = PatchGrid::new(3, 3, nodes).unwrap();
    let tris = vp.patch_triangles(&grid, &PositionMatrix::default(), &bmp);
    assert_eq!(tris.len(), 6);
    assert!(tris.iter().any(|t| t.nodes.contains(&0)));
    assert!(tris.iter().all(|t| !t.nodes.contains(&8)));
}
