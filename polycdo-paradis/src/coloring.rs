use crate::DisjointSubsets;
use polycdo_index::Adjacency;
use std::mem;

/// Greedily partition `subsets` into colors of pairwise disjoint subsets.
///
/// Subset `i` receives label `i`. Within a color, subsets keep their relative order.
pub fn sequential_greedy_coloring(subsets: &Adjacency) -> Vec<DisjointSubsets> {
    let mut colors = Vec::new();
    let mut postponed_subset_indices = Vec::new();
    let mut current_subset_indices: Vec<_> = (0..subsets.len()).collect();

    // Index of the last color to visit any given node. The number of nodes is not known up
    // front, so the table grows as larger indices show up.
    let mut last_visited_color = vec![usize::MAX; 0];

    let mut color_idx = 0usize;
    while !current_subset_indices.is_empty() {
        let mut color_subsets = Adjacency::new();
        let mut color_subset_indices = Vec::new();
        let mut max_node_idx = None;
        for &subset_idx in &current_subset_indices {
            let subset = subsets.get(subset_idx);
            let is_blocked = subset.iter().any(|node_idx| {
                last_visited_color
                    .get(*node_idx)
                    .map(|&idx_of_last_visitor| idx_of_last_visitor == color_idx)
                    .unwrap_or(false)
            });
            if is_blocked {
                postponed_subset_indices.push(subset_idx);
            } else {
                for &node_idx in subset {
                    max_node_idx = Some(max_node_idx.map_or(node_idx, |m: usize| m.max(node_idx)));
                    if let Some(current_visitor) = last_visited_color.get_mut(node_idx) {
                        *current_visitor = color_idx;
                    } else {
                        // Amortize resizes by growing past what we need right now
                        last_visited_color.resize(2 * node_idx + 1, usize::MAX);
                        last_visited_color[node_idx] = color_idx;
                    }
                }
                color_subsets.push(subset);
                color_subset_indices.push(subset_idx);
            }
        }

        debug_assert!(
            DisjointSubsets::try_from_disjoint_subsets(color_subsets.clone(), color_subset_indices.clone()).is_ok()
        );

        // Disjoint by construction
        let color = unsafe {
            DisjointSubsets::from_disjoint_subsets_unchecked(color_subsets, color_subset_indices, max_node_idx)
        };
        colors.push(color);
        mem::swap(&mut postponed_subset_indices, &mut current_subset_indices);
        postponed_subset_indices.clear();
        color_idx += 1;
    }

    colors
}
