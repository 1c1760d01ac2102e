//! Basic procedural mesh generation routines.
//!
//! Every generated mesh defines named boundary zones. Box meshes define `x_min`, `x_max`,
//! `y_min`, `y_max`, `z_min` and `z_max`; single cells define a single zone `boundary`.
use crate::error::CdoError;
use crate::mesh::RawMesh;
use nalgebra::Point3;
use polycdo_index::Adjacency;

pub fn create_unit_box_uniform_hex_mesh(cells_per_dim: usize) -> Result<RawMesh, CdoError> {
    create_rectangular_uniform_hex_mesh(1.0, 1, 1, 1, cells_per_dim)
}

/// Generates an axis-aligned box mesh of uniform hexahedra given a unit length,
/// dimensions as multipliers of the unit length and the number of cells per unit length.
///
/// The box spans `[0, units_x * unit_length] x [0, units_y * unit_length] x [0, units_z * unit_length]`.
pub fn create_rectangular_uniform_hex_mesh(
    unit_length: f64,
    units_x: usize,
    units_y: usize,
    units_z: usize,
    cells_per_unit: usize,
) -> Result<RawMesh, CdoError> {
    if cells_per_unit == 0 || units_x == 0 || units_y == 0 || units_z == 0 {
        return Err(CdoError::InvalidMesh("a box mesh needs at least one cell".to_string()));
    }

    let cell_size = unit_length / cells_per_unit as f64;
    let nx = units_x * cells_per_unit;
    let ny = units_y * cells_per_unit;
    let nz = units_z * cells_per_unit;

    let vertex = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);

    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push(Point3::new(i as f64, j as f64, k as f64) * cell_size);
            }
        }
    }

    // Faces are first generated per direction ("raw" numbering), then renumbered so that interior
    // faces come first
    let n_x_faces = (nx + 1) * ny * nz;
    let n_y_faces = nx * (ny + 1) * nz;
    let n_z_faces = nx * ny * (nz + 1);
    let x_face = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + ny * k);
    let y_face = |i: usize, j: usize, k: usize| n_x_faces + i + nx * (j + (ny + 1) * k);
    let z_face = |i: usize, j: usize, k: usize| n_x_faces + n_y_faces + i + nx * (j + ny * k);

    let n_raw_faces = n_x_faces + n_y_faces + n_z_faces;
    let mut raw_loops = vec![[0usize; 4]; n_raw_faces];
    // Zone index of each boundary face, in the order x_min, x_max, y_min, y_max, z_min, z_max
    let mut raw_zone = vec![None; n_raw_faces];

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..=nx {
                raw_loops[x_face(i, j, k)] = [
                    vertex(i, j, k),
                    vertex(i, j + 1, k),
                    vertex(i, j + 1, k + 1),
                    vertex(i, j, k + 1),
                ];
                raw_zone[x_face(i, j, k)] = boundary_zone(i, nx, 0);
            }
        }
    }
    for k in 0..nz {
        for j in 0..=ny {
            for i in 0..nx {
                raw_loops[y_face(i, j, k)] = [
                    vertex(i, j, k),
                    vertex(i, j, k + 1),
                    vertex(i + 1, j, k + 1),
                    vertex(i + 1, j, k),
                ];
                raw_zone[y_face(i, j, k)] = boundary_zone(j, ny, 2);
            }
        }
    }
    for k in 0..=nz {
        for j in 0..ny {
            for i in 0..nx {
                raw_loops[z_face(i, j, k)] = [
                    vertex(i, j, k),
                    vertex(i + 1, j, k),
                    vertex(i + 1, j + 1, k),
                    vertex(i, j + 1, k),
                ];
                raw_zone[z_face(i, j, k)] = boundary_zone(k, nz, 4);
            }
        }
    }

    // The loops above run counterclockwise around the +axis direction, so faces on the min side of
    // the box are reversed to keep every boundary normal pointing out of the domain
    for (face_loop, zone) in raw_loops.iter_mut().zip(&raw_zone) {
        if matches!(zone, Some(z) if z % 2 == 0) {
            face_loop.swap(1, 3);
        }
    }

    let n_interior_faces = raw_zone.iter().filter(|zone| zone.is_none()).count();
    let mut new_id = vec![0usize; n_raw_faces];
    let mut next_interior = 0;
    let mut next_boundary = n_interior_faces;
    for (raw, zone) in raw_zone.iter().enumerate() {
        let counter = if zone.is_none() {
            &mut next_interior
        } else {
            &mut next_boundary
        };
        new_id[raw] = *counter;
        *counter += 1;
    }

    let mut loops = vec![[0usize; 4]; n_raw_faces];
    let mut zone_faces = vec![Vec::new(); 6];
    for raw in 0..n_raw_faces {
        loops[new_id[raw]] = raw_loops[raw];
        if let Some(zone) = raw_zone[raw] {
            zone_faces[zone].push(new_id[raw] - n_interior_faces);
        }
    }
    for faces in &mut zone_faces {
        faces.sort_unstable();
    }

    let mut face_vertices = Adjacency::new();
    for face_loop in &loops {
        face_vertices.push(face_loop);
    }

    let mut cell_faces = Adjacency::new();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                cell_faces.push(&[
                    new_id[x_face(i, j, k)],
                    new_id[x_face(i + 1, j, k)],
                    new_id[y_face(i, j, k)],
                    new_id[y_face(i, j + 1, k)],
                    new_id[z_face(i, j, k)],
                    new_id[z_face(i, j, k + 1)],
                ]);
            }
        }
    }

    let mut mesh = RawMesh::from_parts(vertices, face_vertices, n_interior_faces, cell_faces)?;
    let names = ["x_min", "x_max", "y_min", "y_max", "z_min", "z_max"];
    for (name, faces) in names.iter().zip(zone_faces) {
        mesh = mesh.with_zone(*name, faces)?;
    }
    Ok(mesh)
}

fn boundary_zone(index: usize, n_cells: usize, zone_offset: usize) -> Option<usize> {
    if index == 0 {
        Some(zone_offset)
    } else if index == n_cells {
        Some(zone_offset + 1)
    } else {
        None
    }
}

fn single_cell_mesh(vertices: Vec<Point3<f64>>, loops: &[&[usize]]) -> Result<RawMesh, CdoError> {
    let mut face_vertices = Adjacency::new();
    for face_loop in loops {
        face_vertices.push(face_loop);
    }
    let n_faces = loops.len();
    let faces: Vec<usize> = (0..n_faces).collect();
    let cell_faces = Adjacency::from(vec![faces.clone()]);
    RawMesh::from_parts(vertices, face_vertices, 0, cell_faces)?.with_zone("boundary", faces)
}

/// The reference tetrahedron with vertices at the origin and the three unit points.
pub fn create_single_tetrahedron_mesh() -> Result<RawMesh, CdoError> {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
    ];
    single_cell_mesh(vertices, &[&[0, 2, 1], &[0, 1, 3], &[0, 3, 2], &[1, 2, 3]])
}

/// The reference triangle extruded by one unit along z.
pub fn create_single_prism_mesh() -> Result<RawMesh, CdoError> {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ];
    single_cell_mesh(
        vertices,
        &[&[0, 2, 1], &[3, 4, 5], &[0, 1, 4, 3], &[1, 2, 5, 4], &[2, 0, 3, 5]],
    )
}

/// A pyramid on the unit square with its apex one unit above the square center.
pub fn create_single_pyramid_mesh() -> Result<RawMesh, CdoError> {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.5, 0.5, 1.0),
    ];
    single_cell_mesh(
        vertices,
        &[&[0, 3, 2, 1], &[0, 1, 4], &[1, 2, 4], &[2, 3, 4], &[3, 0, 4]],
    )
}
