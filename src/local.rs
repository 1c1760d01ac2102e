//! Cell-local views of the mesh and cell-local dense matrices.
//!
//! A [`CellMesh`] holds the quantities of one cell renumbered locally: vertices follow the
//! order of `c2v`, edges the order of `c2e` and faces the order of `c2f`. It is allocated once
//! with the mesh-wide maxima and repopulated for every cell; only the parts selected by a
//! [`CellMeshFlag`] are filled in.
use crate::connectivity::{BoundaryClass, MeshMaxima};
use crate::context::CdoContext;
use crate::quantities::{DualEdge, DualFace, PrimalQuantity};
use nalgebra::{DMatrix, Point3};
use std::fmt;
use std::ops::{BitOr, BitOrAssign, Index, IndexMut};

/// Selects the parts of a [`CellMesh`] to populate.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct CellMeshFlag(u32);

impl CellMeshFlag {
    pub const NONE: Self = Self(0);
    /// Vertex ids and coordinates.
    pub const VERTICES: Self = Self(1);
    /// Fractions of the cell volume held by the dual cell of each vertex.
    pub const DUAL_VOLUMES: Self = Self(1 << 1);
    /// Edge ids and quantities.
    pub const EDGES: Self = Self(1 << 2);
    pub const DUAL_FACES: Self = Self(1 << 3);
    /// Face ids, orientation signs and quantities.
    pub const FACES: Self = Self(1 << 4);
    pub const DUAL_EDGES: Self = Self(1 << 5);
    /// Local edge to vertex incidence.
    pub const EV: Self = Self(1 << 6);
    /// Local face to edge incidence, with the face-edge triangle areas.
    pub const FE: Self = Self(1 << 7);
    /// Local edge to face incidence.
    pub const EF: Self = Self(1 << 8);
    /// Distance from the cell barycenter to the plane of each face.
    pub const HFC: Self = Self(1 << 9);

    const DEPENDENCIES: [(Self, Self); 7] = [
        (Self::DUAL_VOLUMES, Self::VERTICES),
        (Self::DUAL_FACES, Self::EDGES),
        (Self::DUAL_EDGES, Self::FACES),
        (Self::EV, Self(Self::VERTICES.0 | Self::EDGES.0)),
        (Self::FE, Self(Self::FACES.0 | Self::EDGES.0)),
        (Self::EF, Self::FE),
        (Self::HFC, Self::FACES),
    ];

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Add every part needed to compute the requested parts.
    pub fn resolved(self) -> Self {
        let mut flag = self;
        loop {
            let mut next = flag;
            for (part, needs) in Self::DEPENDENCIES {
                if flag.contains(part) {
                    next |= needs;
                }
            }
            if next == flag {
                return flag;
            }
            flag = next;
        }
    }
}

impl BitOr for CellMeshFlag {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CellMeshFlag {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0
    }
}

impl fmt::Debug for CellMeshFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 10] = [
            "VERTICES",
            "DUAL_VOLUMES",
            "EDGES",
            "DUAL_FACES",
            "FACES",
            "DUAL_EDGES",
            "EV",
            "FE",
            "EF",
            "HFC",
        ];
        let names: Vec<_> = NAMES
            .iter()
            .enumerate()
            .filter(|(i, _)| self.0 & (1 << i) != 0)
            .map(|(_, name)| *name)
            .collect();
        write!(f, "CellMeshFlag({})", names.join(" | "))
    }
}

#[derive(Debug, Clone)]
pub struct CellMesh {
    flag: CellMeshFlag,
    c_id: usize,
    xc: Point3<f64>,
    vol: f64,
    class: BoundaryClass,
    n_boundary_faces: usize,

    n_vc: usize,
    v_ids: Vec<usize>,
    xv: Vec<Point3<f64>>,
    wvc: Vec<f64>,

    n_ec: usize,
    e_ids: Vec<usize>,
    edges: Vec<PrimalQuantity>,
    dface: Vec<DualFace>,

    n_fc: usize,
    f_ids: Vec<usize>,
    f_sgn: Vec<i8>,
    faces: Vec<PrimalQuantity>,
    dedge: Vec<DualEdge>,
    hfc: Vec<f64>,

    e2v_ids: Vec<usize>,
    e2v_sgn: Vec<i8>,

    f2e_idx: Vec<usize>,
    f2e_ids: Vec<usize>,
    f2e_sgn: Vec<i8>,
    tef: Vec<f64>,

    e2f_ids: Vec<usize>,
    e2f_count: Vec<usize>,
}

impl CellMesh {
    /// Allocate a cell mesh able to hold any cell of a mesh with the given maxima.
    pub fn with_capacity(maxima: &MeshMaxima) -> Self {
        let n_v = maxima.n_vertices_per_cell;
        let n_e = maxima.n_edges_per_cell;
        let n_f = maxima.n_faces_per_cell;
        let n_fe = maxima.n_face_edges_per_cell;
        Self {
            flag: CellMeshFlag::NONE,
            c_id: usize::MAX,
            xc: Point3::origin(),
            vol: 0.0,
            class: BoundaryClass::Interior,
            n_boundary_faces: 0,
            n_vc: 0,
            v_ids: vec![0; n_v],
            xv: vec![Point3::origin(); n_v],
            wvc: vec![0.0; n_v],
            n_ec: 0,
            e_ids: vec![0; n_e],
            edges: vec![PrimalQuantity::default(); n_e],
            dface: vec![DualFace::default(); n_e],
            n_fc: 0,
            f_ids: vec![0; n_f],
            f_sgn: vec![0; n_f],
            faces: vec![PrimalQuantity::default(); n_f],
            dedge: vec![DualEdge::default(); n_f],
            hfc: vec![0.0; n_f],
            e2v_ids: vec![0; 2 * n_e],
            e2v_sgn: vec![0; 2 * n_e],
            f2e_idx: vec![0; n_f + 1],
            f2e_ids: vec![0; n_fe],
            f2e_sgn: vec![0; n_fe],
            tef: vec![0.0; n_fe],
            e2f_ids: vec![0; 2 * n_e],
            e2f_count: vec![0; n_e],
        }
    }

    /// Fill in the parts of the view of cell `c_id` selected by `flag` (and their dependencies).
    ///
    /// # Panics
    ///
    /// Panics if the cell exceeds the capacity this view was allocated with.
    pub fn populate(&mut self, ctx: &CdoContext, c_id: usize, flag: CellMeshFlag) {
        let flag = flag.resolved();
        let connect = ctx.connectivity();
        let quant = ctx.quantities();

        self.flag = flag;
        self.c_id = c_id;
        self.xc = *quant.cell_center(c_id);
        self.vol = quant.cell_volume(c_id);
        self.class = connect.cell_class(c_id);
        self.n_boundary_faces = connect.n_cell_boundary_faces(c_id);

        if flag.contains(CellMeshFlag::VERTICES) {
            let vertices = connect.c2v().get(c_id);
            self.n_vc = vertices.len();
            self.v_ids[..self.n_vc].copy_from_slice(vertices);
            for (x, &v) in self.xv.iter_mut().zip(vertices) {
                *x = *quant.vertex(v);
            }
            if flag.contains(CellMeshFlag::DUAL_VOLUMES) {
                let range = connect.c2v().range(c_id);
                for (w, vol) in self.wvc.iter_mut().zip(&quant.dual_volumes()[range]) {
                    *w = vol / self.vol;
                }
            }
        }

        if flag.contains(CellMeshFlag::EDGES) {
            let edges = connect.c2e().get(c_id);
            self.n_ec = edges.len();
            self.e_ids[..self.n_ec].copy_from_slice(edges);
            for (q, &e) in self.edges.iter_mut().zip(edges) {
                *q = *quant.edge(e);
            }
            if flag.contains(CellMeshFlag::DUAL_FACES) {
                let range = connect.c2e().range(c_id);
                self.dface[..self.n_ec].copy_from_slice(&quant.dual_faces()[range]);
            }
        }

        if flag.contains(CellMeshFlag::FACES) {
            let faces = connect.c2f().get(c_id);
            let signs = connect.c2f().get_signs(c_id).unwrap_or(&[]);
            self.n_fc = faces.len();
            self.f_ids[..self.n_fc].copy_from_slice(faces);
            self.f_sgn[..self.n_fc].copy_from_slice(signs);
            for (q, &f) in self.faces.iter_mut().zip(faces) {
                *q = *quant.face(f);
            }
            if flag.contains(CellMeshFlag::DUAL_EDGES) {
                let range = connect.c2f().range(c_id);
                self.dedge[..self.n_fc].copy_from_slice(&quant.dual_edges()[range]);
            }
            if flag.contains(CellMeshFlag::HFC) {
                for k in 0..self.n_fc {
                    let face = &self.faces[k];
                    self.hfc[k] = face.unitv.dot(&(face.center - self.xc)).abs();
                }
            }
        }

        if flag.contains(CellMeshFlag::EV) {
            let e2v = connect.e2v();
            for k in 0..self.n_ec {
                let e = self.e_ids[k];
                for (slot, &v) in e2v.get(e).iter().enumerate() {
                    self.e2v_ids[2 * k + slot] = self.local_vertex(v);
                }
                // Edges run from their lower to their higher vertex id
                self.e2v_sgn[2 * k] = -1;
                self.e2v_sgn[2 * k + 1] = 1;
            }
        }

        if flag.contains(CellMeshFlag::FE) {
            let f2e = connect.f2e();
            let tef = quant.face_edge_areas();
            let mut pos = 0;
            self.f2e_idx[0] = 0;
            for k in 0..self.n_fc {
                let f = self.f_ids[k];
                let range = f2e.range(f);
                let signs = f2e.get_signs(f).unwrap_or(&[]);
                for (j, &e) in f2e.get(f).iter().enumerate() {
                    self.f2e_ids[pos] = self.local_edge(e);
                    self.f2e_sgn[pos] = signs[j];
                    self.tef[pos] = tef[range.start + j];
                    pos += 1;
                }
                self.f2e_idx[k + 1] = pos;
            }
        }

        if flag.contains(CellMeshFlag::EF) {
            self.e2f_count[..self.n_ec].fill(0);
            for k in 0..self.n_fc {
                for pos in self.f2e_idx[k]..self.f2e_idx[k + 1] {
                    let e = self.f2e_ids[pos];
                    let slot = self.e2f_count[e].min(1);
                    self.e2f_ids[2 * e + slot] = k;
                    self.e2f_count[e] += 1;
                }
            }
            debug_assert!(self.e2f_count[..self.n_ec].iter().all(|&n| n == 2));
        }
    }

    fn local_vertex(&self, v: usize) -> usize {
        self.v_ids[..self.n_vc]
            .iter()
            .position(|&w| w == v)
            .unwrap_or(usize::MAX)
    }

    fn local_edge(&self, e: usize) -> usize {
        self.e_ids[..self.n_ec]
            .iter()
            .position(|&w| w == e)
            .unwrap_or(usize::MAX)
    }

    pub fn flag(&self) -> CellMeshFlag {
        self.flag
    }

    pub fn id(&self) -> usize {
        self.c_id
    }

    pub fn center(&self) -> &Point3<f64> {
        &self.xc
    }

    pub fn volume(&self) -> f64 {
        self.vol
    }

    pub fn boundary_class(&self) -> BoundaryClass {
        self.class
    }

    pub fn n_boundary_faces(&self) -> usize {
        self.n_boundary_faces
    }

    pub fn n_vertices(&self) -> usize {
        self.n_vc
    }

    pub fn vertex_ids(&self) -> &[usize] {
        &self.v_ids[..self.n_vc]
    }

    pub fn vertex_coords(&self) -> &[Point3<f64>] {
        &self.xv[..self.n_vc]
    }

    /// Volume fraction of the cell held by the dual cell of each vertex.
    pub fn wvc(&self) -> &[f64] {
        &self.wvc[..self.n_vc]
    }

    pub fn n_edges(&self) -> usize {
        self.n_ec
    }

    pub fn edge_ids(&self) -> &[usize] {
        &self.e_ids[..self.n_ec]
    }

    pub fn edges(&self) -> &[PrimalQuantity] {
        &self.edges[..self.n_ec]
    }

    pub fn dual_faces(&self) -> &[DualFace] {
        &self.dface[..self.n_ec]
    }

    pub fn n_faces(&self) -> usize {
        self.n_fc
    }

    pub fn face_ids(&self) -> &[usize] {
        &self.f_ids[..self.n_fc]
    }

    /// Orientation of each face normal relative to the cell (`+1` outward).
    pub fn face_signs(&self) -> &[i8] {
        &self.f_sgn[..self.n_fc]
    }

    pub fn faces(&self) -> &[PrimalQuantity] {
        &self.faces[..self.n_fc]
    }

    pub fn dual_edges(&self) -> &[DualEdge] {
        &self.dedge[..self.n_fc]
    }

    pub fn hfc(&self) -> &[f64] {
        &self.hfc[..self.n_fc]
    }

    /// Local ids of the (lower, higher) vertices of local edge `e`.
    pub fn edge_vertices(&self, e: usize) -> [usize; 2] {
        [self.e2v_ids[2 * e], self.e2v_ids[2 * e + 1]]
    }

    pub fn edge_vertex_signs(&self, e: usize) -> [i8; 2] {
        [self.e2v_sgn[2 * e], self.e2v_sgn[2 * e + 1]]
    }

    /// Local ids of the edges of local face `f`.
    pub fn face_edges(&self, f: usize) -> &[usize] {
        &self.f2e_ids[self.f2e_idx[f]..self.f2e_idx[f + 1]]
    }

    pub fn face_edge_signs(&self, f: usize) -> &[i8] {
        &self.f2e_sgn[self.f2e_idx[f]..self.f2e_idx[f + 1]]
    }

    /// Areas of the triangles `(x_f, v1, v2)` for the edges of local face `f`.
    pub fn face_edge_areas(&self, f: usize) -> &[f64] {
        &self.tef[self.f2e_idx[f]..self.f2e_idx[f + 1]]
    }

    /// The two local faces sharing local edge `e`.
    pub fn edge_faces(&self, e: usize) -> [usize; 2] {
        [self.e2f_ids[2 * e], self.e2f_ids[2 * e + 1]]
    }

    /// Local id of the face with global id `f_id`, if it belongs to the cell.
    pub fn local_face(&self, f_id: usize) -> Option<usize> {
        self.face_ids().iter().position(|&f| f == f_id)
    }
}

/// The view of one face of a cell.
///
/// Vertices are listed in the order they appear along the face edges. The normal is oriented
/// out of the cell.
#[derive(Debug, Clone)]
pub struct FaceMesh {
    c_id: usize,
    f_id: usize,
    face: PrimalQuantity,
    hfc: f64,

    n_vf: usize,
    v_ids: Vec<usize>,
    cell_v: Vec<usize>,
    xv: Vec<Point3<f64>>,
    wvf: Vec<f64>,

    n_ef: usize,
    e_ids: Vec<usize>,
    tef: Vec<f64>,
    e2v: Vec<usize>,
}

impl FaceMesh {
    pub fn with_capacity(maxima: &MeshMaxima) -> Self {
        let n = maxima.n_vertices_per_face;
        Self {
            c_id: usize::MAX,
            f_id: usize::MAX,
            face: PrimalQuantity::default(),
            hfc: 0.0,
            n_vf: 0,
            v_ids: vec![0; n],
            cell_v: vec![0; n],
            xv: vec![Point3::origin(); n],
            wvf: vec![0.0; n],
            n_ef: 0,
            e_ids: vec![0; n],
            tef: vec![0.0; n],
            e2v: vec![0; 2 * n],
        }
    }

    /// Build the view of face `f_id` of cell `c_id` directly from the global arrays.
    pub fn build_from_global(&mut self, ctx: &CdoContext, c_id: usize, f_id: usize) {
        let connect = ctx.connectivity();
        let quant = ctx.quantities();
        let c2f = connect.c2f();
        let k = c2f
            .get(c_id)
            .iter()
            .position(|&f| f == f_id)
            .unwrap_or_else(|| panic!("Face {f_id} does not belong to cell {c_id}"));
        let sgn = c2f.get_signs(c_id).map_or(1, |s| s[k]);
        let cell_vertices = connect.c2v().get(c_id);

        self.c_id = c_id;
        self.f_id = f_id;
        self.face = *quant.face(f_id);
        self.face.unitv *= f64::from(sgn);
        self.hfc = self.face.unitv.dot(&(self.face.center - quant.cell_center(c_id))).abs();
        self.n_vf = 0;
        self.n_ef = 0;

        let tef = &quant.face_edge_areas()[connect.f2e().range(f_id)];
        for (&e, &area) in connect.f2e().get(f_id).iter().zip(tef) {
            let mut pair = [0usize; 2];
            for (slot, &v) in connect.e2v().get(e).iter().enumerate() {
                let cell_local = cell_vertices
                    .iter()
                    .position(|&w| w == v)
                    .unwrap_or(usize::MAX);
                pair[slot] = self.insert_vertex(v, cell_local, quant.vertex(v));
            }
            self.push_edge(e, area, pair);
        }
        self.compute_weights();
    }

    /// Build the view of local face `f` of an already populated cell view.
    ///
    /// The cell view must hold at least `FACES | EV | FE`.
    pub fn build_from_cell_mesh(&mut self, cm: &CellMesh, f: usize) {
        debug_assert!(cm
            .flag()
            .contains(CellMeshFlag::FACES | CellMeshFlag::EV | CellMeshFlag::FE));

        self.c_id = cm.id();
        self.f_id = cm.face_ids()[f];
        self.face = cm.faces()[f];
        self.face.unitv *= f64::from(cm.face_signs()[f]);
        self.hfc = self.face.unitv.dot(&(self.face.center - cm.center())).abs();
        self.n_vf = 0;
        self.n_ef = 0;

        for (&e, &area) in cm.face_edges(f).iter().zip(cm.face_edge_areas(f)) {
            let mut pair = [0usize; 2];
            for (slot, &v) in cm.edge_vertices(e).iter().enumerate() {
                pair[slot] = self.insert_vertex(cm.vertex_ids()[v], v, &cm.vertex_coords()[v]);
            }
            self.push_edge(cm.edge_ids()[e], area, pair);
        }
        self.compute_weights();
    }

    fn insert_vertex(&mut self, v_id: usize, cell_local: usize, x: &Point3<f64>) -> usize {
        if let Some(k) = self.v_ids[..self.n_vf].iter().position(|&w| w == v_id) {
            return k;
        }
        let k = self.n_vf;
        self.v_ids[k] = v_id;
        self.cell_v[k] = cell_local;
        self.xv[k] = *x;
        self.n_vf += 1;
        k
    }

    fn push_edge(&mut self, e_id: usize, tef: f64, pair: [usize; 2]) {
        let k = self.n_ef;
        self.e_ids[k] = e_id;
        self.tef[k] = tef;
        self.e2v[2 * k] = pair[0];
        self.e2v[2 * k + 1] = pair[1];
        self.n_ef += 1;
    }

    fn compute_weights(&mut self) {
        self.wvf[..self.n_vf].fill(0.0);
        let inv_meas = 1.0 / self.face.meas;
        for k in 0..self.n_ef {
            let w = 0.5 * self.tef[k] * inv_meas;
            self.wvf[self.e2v[2 * k]] += w;
            self.wvf[self.e2v[2 * k + 1]] += w;
        }
    }

    pub fn cell_id(&self) -> usize {
        self.c_id
    }

    pub fn id(&self) -> usize {
        self.f_id
    }

    /// Face quantity, with the normal pointing out of the cell.
    pub fn face(&self) -> &PrimalQuantity {
        &self.face
    }

    /// Distance from the cell barycenter to the plane of the face.
    pub fn hfc(&self) -> f64 {
        self.hfc
    }

    pub fn n_vertices(&self) -> usize {
        self.n_vf
    }

    pub fn vertex_ids(&self) -> &[usize] {
        &self.v_ids[..self.n_vf]
    }

    /// Ids of the face vertices in the numbering of the cell view.
    pub fn cell_vertex_ids(&self) -> &[usize] {
        &self.cell_v[..self.n_vf]
    }

    pub fn vertex_coords(&self) -> &[Point3<f64>] {
        &self.xv[..self.n_vf]
    }

    /// Area fraction of the face attached to each vertex. Sums to one.
    pub fn wvf(&self) -> &[f64] {
        &self.wvf[..self.n_vf]
    }

    pub fn n_edges(&self) -> usize {
        self.n_ef
    }

    pub fn edge_ids(&self) -> &[usize] {
        &self.e_ids[..self.n_ef]
    }

    pub fn edge_areas(&self) -> &[f64] {
        &self.tef[..self.n_ef]
    }

    /// Face-local ids of the vertices of face-local edge `e`.
    pub fn edge_vertices(&self, e: usize) -> [usize; 2] {
        [self.e2v[2 * e], self.e2v[2 * e + 1]]
    }
}

/// A square dense matrix with a fixed capacity and a logical size set per cell.
///
/// Entries are stored row-major in the leading `n * n` part of the storage. Alongside the
/// values, the matrix maps each local index to a global id.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMatrix {
    n: usize,
    capacity: usize,
    ids: Vec<usize>,
    val: Vec<f64>,
}

impl LocalMatrix {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            n: 0,
            capacity,
            ids: vec![0; capacity],
            val: vec![0.0; capacity * capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Set the logical size and zero the entries.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the capacity.
    pub fn reset(&mut self, n: usize) {
        assert!(n <= self.capacity, "Local matrix of size {n} exceeds capacity {}", self.capacity);
        self.n = n;
        self.val[..n * n].fill(0.0);
    }

    /// Set the logical size from `ids` and zero the entries.
    pub fn reset_with_ids(&mut self, ids: &[usize]) {
        self.reset(ids.len());
        self.ids[..ids.len()].copy_from_slice(ids);
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids[..self.n]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.val[i * self.n..(i + 1) * self.n]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        let n = self.n;
        &mut self.val[i * n..(i + 1) * n]
    }

    pub fn values(&self) -> &[f64] {
        &self.val[..self.n * self.n]
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        let n = self.n;
        &mut self.val[..n * n]
    }

    /// Copy the logical size, ids and entries of `other`.
    pub fn copy_from(&mut self, other: &LocalMatrix) {
        self.reset_with_ids(other.ids());
        self.values_mut().copy_from_slice(other.values());
    }

    pub fn scale(&mut self, s: f64) {
        self.values_mut().iter_mut().for_each(|x| *x *= s);
    }

    /// `self += s * other`, for matrices of equal logical size.
    pub fn add_scaled(&mut self, other: &LocalMatrix, s: f64) {
        assert_eq!(self.n, other.n, "Local matrices must have the same size");
        for (x, y) in self.values_mut().iter_mut().zip(other.values()) {
            *x += s * y;
        }
    }

    /// `y = self * x`.
    pub fn matvec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n);
        assert_eq!(y.len(), self.n);
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self.row(i).iter().zip(x).map(|(a, b)| a * b).sum();
        }
    }

    /// Replace every row by its sum placed on the diagonal.
    pub fn lump(&mut self) {
        for i in 0..self.n {
            let sum: f64 = self.row(i).iter().sum();
            let row = self.row_mut(i);
            row.fill(0.0);
            row[i] = sum;
        }
    }

    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.n, self.n, self.values())
    }
}

impl Index<(usize, usize)> for LocalMatrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        debug_assert!(i < self.n && j < self.n);
        &self.val[i * self.n + j]
    }
}

impl IndexMut<(usize, usize)> for LocalMatrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        debug_assert!(i < self.n && j < self.n);
        &mut self.val[i * self.n + j]
    }
}
