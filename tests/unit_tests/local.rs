use crate::unit_tests::{context, full_cell_meshes, sheared_box_mesh};
use itertools::Itertools;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::DMatrix;
use polycdo::local::{CellMesh, CellMeshFlag, FaceMesh, LocalMatrix};
use polycdo::mesh::procedural::{create_single_prism_mesh, create_single_pyramid_mesh};

#[test]
fn cell_mesh_flag_resolves_dependencies() {
    let flag = CellMeshFlag::EF.resolved();
    assert!(flag.contains(CellMeshFlag::FE));
    assert!(flag.contains(CellMeshFlag::FACES | CellMeshFlag::EDGES));
    assert!(!flag.contains(CellMeshFlag::VERTICES));

    let flag = (CellMeshFlag::DUAL_VOLUMES | CellMeshFlag::EV).resolved();
    assert!(flag.contains(CellMeshFlag::VERTICES | CellMeshFlag::EDGES));
    assert!(!flag.contains(CellMeshFlag::FACES));

    assert_eq!(CellMeshFlag::NONE.resolved(), CellMeshFlag::NONE);
    assert_eq!(format!("{:?}", CellMeshFlag::HFC), "CellMeshFlag(HFC)");
}

#[test]
fn cell_mesh_matches_global_relations() {
    let ctx = context(sheared_box_mesh(2));
    let connect = ctx.connectivity();
    for cm in full_cell_meshes(&ctx) {
        let c = cm.id();
        assert_eq!(cm.vertex_ids(), connect.c2v().get(c));
        assert_eq!(cm.edge_ids(), connect.c2e().get(c));
        assert_eq!(cm.face_ids(), connect.c2f().get(c));
        assert_eq!(cm.face_signs(), connect.c2f().get_signs(c).unwrap());
        assert_eq!(cm.n_boundary_faces(), connect.n_cell_boundary_faces(c));
        assert_eq!(cm.boundary_class(), connect.cell_class(c));

        assert_scalar_eq!(cm.wvc().iter().sum::<f64>(), 1.0, comp = abs, tol = 1e-14);

        for e in 0..cm.n_edges() {
            let global: Vec<_> = cm.edge_vertices(e).iter().map(|&v| cm.vertex_ids()[v]).collect();
            assert_eq!(global, connect.e2v().get(cm.edge_ids()[e]));
            assert_eq!(cm.edge_vertex_signs(e), [-1, 1]);

            // Every local edge is shared by exactly two local faces
            let [f1, f2] = cm.edge_faces(e);
            assert_ne!(f1, f2);
            assert!(cm.face_edges(f1).contains(&e));
            assert!(cm.face_edges(f2).contains(&e));
        }

        for f in 0..cm.n_faces() {
            let global: Vec<_> = cm.face_edges(f).iter().map(|&e| cm.edge_ids()[e]).collect();
            assert_eq!(global, connect.f2e().get(cm.face_ids()[f]));
            assert_eq!(cm.face_edge_signs(f), connect.f2e().get_signs(cm.face_ids()[f]).unwrap());
            assert_eq!(cm.local_face(cm.face_ids()[f]), Some(f));
        }
        assert_eq!(cm.local_face(usize::MAX), None);
    }
}

#[test]
fn cell_mesh_is_reusable_across_cells_of_different_shapes() {
    let prism = context(create_single_prism_mesh().unwrap());
    let pyramid = context(create_single_pyramid_mesh().unwrap());
    let maxima = *prism.connectivity().maxima();
    let mut cm = CellMesh::with_capacity(&maxima);

    cm.populate(&prism, 0, CellMeshFlag::EF | CellMeshFlag::DUAL_VOLUMES);
    assert_eq!((cm.n_vertices(), cm.n_edges(), cm.n_faces()), (6, 9, 5));

    // The pyramid fits into storage sized for the prism
    cm.populate(&pyramid, 0, CellMeshFlag::EF | CellMeshFlag::DUAL_VOLUMES);
    assert_eq!((cm.n_vertices(), cm.n_edges(), cm.n_faces()), (5, 8, 5));
    assert_scalar_eq!(cm.volume(), 1.0 / 3.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(cm.wvc().iter().sum::<f64>(), 1.0, comp = abs, tol = 1e-14);
}

#[test]
fn face_mesh_from_cell_mesh_agrees_with_global_construction() {
    let ctx = context(sheared_box_mesh(2));
    let maxima = ctx.connectivity().maxima();
    let mut from_global = FaceMesh::with_capacity(maxima);
    let mut from_cell = FaceMesh::with_capacity(maxima);

    for cm in full_cell_meshes(&ctx) {
        for f in 0..cm.n_faces() {
            let f_id = cm.face_ids()[f];
            from_global.build_from_global(&ctx, cm.id(), f_id);
            from_cell.build_from_cell_mesh(&cm, f);

            assert_eq!(from_cell.id(), f_id);
            assert_eq!(from_cell.cell_id(), cm.id());
            assert_eq!(from_global.n_vertices(), 4);
            assert_eq!(from_cell.n_vertices(), 4);
            assert_eq!(from_cell.n_edges(), 4);

            let sorted = |fm: &FaceMesh| -> Vec<_> {
                fm.vertex_ids()
                    .iter()
                    .zip(fm.cell_vertex_ids())
                    .zip(fm.wvf())
                    .map(|((&v, &local), &w)| (v, local, w))
                    .sorted_by_key(|&(v, ..)| v)
                    .collect()
            };
            for ((v1, l1, w1), (v2, l2, w2)) in sorted(&from_global).into_iter().zip(sorted(&from_cell)) {
                assert_eq!(v1, v2);
                assert_eq!(l1, l2);
                assert_eq!(cm.vertex_ids()[l1], v1);
                assert_scalar_eq!(w1, w2, comp = abs, tol = 1e-14);
            }

            assert_matrix_eq!(from_global.face().unitv, from_cell.face().unitv, comp = abs, tol = 1e-14);
            assert_scalar_eq!(from_global.face().meas, from_cell.face().meas, comp = abs, tol = 1e-14);
            assert_scalar_eq!(from_global.hfc(), from_cell.hfc(), comp = abs, tol = 1e-14);
            assert_scalar_eq!(from_cell.hfc(), cm.hfc()[f], comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn face_mesh_normal_points_out_of_the_cell() {
    let ctx = context(sheared_box_mesh(2));
    let mut fm = FaceMesh::with_capacity(ctx.connectivity().maxima());
    for cm in full_cell_meshes(&ctx) {
        for f in 0..cm.n_faces() {
            fm.build_from_cell_mesh(&cm, f);
            let face = fm.face();
            assert!(face.unitv.dot(&(face.center - cm.center())) > 0.0);
            assert_scalar_eq!(fm.wvf().iter().sum::<f64>(), 1.0, comp = abs, tol = 1e-14);
            assert_scalar_eq!(fm.edge_areas().iter().sum::<f64>(), face.meas, comp = abs, tol = 1e-14);
            for e in 0..fm.n_edges() {
                let [a, b] = fm.edge_vertices(e);
                assert!(a < fm.n_vertices() && b < fm.n_vertices());
                assert_ne!(a, b);
            }
        }
    }
}

#[test]
fn local_matrix_operations() {
    let mut a = LocalMatrix::with_capacity(4);
    assert_eq!(a.capacity(), 4);
    a.reset_with_ids(&[10, 3, 7]);
    assert_eq!(a.n(), 3);
    assert_eq!(a.ids(), &[10, 3, 7]);
    for i in 0..3 {
        for j in 0..3 {
            a[(i, j)] = (3 * i + j) as f64;
        }
    }
    assert_eq!(a.row(1), &[3.0, 4.0, 5.0]);

    let mut y = [0.0; 3];
    a.matvec(&[1.0, 0.0, -1.0], &mut y);
    assert_eq!(y, [-2.0, -2.0, -2.0]);

    let mut b = LocalMatrix::with_capacity(4);
    b.copy_from(&a);
    assert_eq!(b.ids(), a.ids());
    b.scale(2.0);
    b.add_scaled(&a, -1.0);
    assert_eq!(b.values(), a.values());

    b.lump();
    let expected = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![3.0, 12.0, 21.0]));
    assert_matrix_eq!(b.to_dmatrix(), expected);

    // Shrinking and growing again zeroes the entries
    a.reset(2);
    assert_eq!(a.values(), &[0.0; 4]);
    a.reset(4);
    assert!(a.values().iter().all(|&x| x == 0.0));
}

#[test]
#[should_panic]
fn local_matrix_rejects_sizes_beyond_capacity() {
    let mut a = LocalMatrix::with_capacity(2);
    a.reset(3);
}
