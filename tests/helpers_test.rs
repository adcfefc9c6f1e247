use floor_viewer::data_structures::helpers::{axes_vertices, grid_vertices};

#[test]
fn should_build_a_square_grid() {
    let grid = grid_vertices(100.0, 100, 0.2);
    assert_eq!(grid.len(), 101 * 4);
    assert!(grid.iter().all(|v| v.position[1] == 0.0));
    assert!(grid.iter().all(|v| v.color[3] == 0.2));
    assert!(
        grid.iter()
            .all(|v| v.position[0].abs() <= 50.0 + 1e-4 && v.position[2].abs() <= 50.0 + 1e-4)
    );
}

#[test]
fn should_darken_the_centre_lines() {
    let grid = grid_vertices(10.0, 2, 1.0);
    // lines at -5, 0, 5: the middle group of four is the centre cross
    let centre = &grid[4..8];
    let outer = &grid[..4];
    assert!(centre.iter().all(|v| v.color[0] < outer[0].color[0]));
    assert!(centre.iter().any(|v| v.position == [0.0, 0.0, -5.0]));
    assert!(centre.iter().any(|v| v.position == [-5.0, 0.0, 0.0]));
}

#[test]
fn should_skip_empty_grids() {
    assert!(grid_vertices(100.0, 0, 0.2).is_empty());
    assert!(grid_vertices(0.0, 10, 0.2).is_empty());
}

#[test]
fn should_colour_axes_by_direction() {
    let axes = axes_vertices(5.0);
    assert_eq!(axes.len(), 6);
    assert_eq!(axes[1].position, [5.0, 0.0, 0.0]);
    assert_eq!(axes[1].color, [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(axes[3].position, [0.0, 5.0, 0.0]);
    assert_eq!(axes[3].color, [0.0, 1.0, 0.0, 1.0]);
    assert_eq!(axes[5].position, [0.0, 0.0, 5.0]);
    assert_eq!(axes[5].color, [0.0, 0.0, 1.0, 1.0]);
}
