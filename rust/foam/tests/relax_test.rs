// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end solver runs through the public API.

mod common;

use std::cell::Cell;
use std::sync::atomic::AtomicBool;

use common::*;
use foamframe::{NeverCancel, RelaxStatus, SolverConfig};
use nalgebra::Point3;

#[test]
fn planar_unit_cube_converges_immediately() {
    let mut foam = unit_cube("cube");
    assert_eq!(foam.vertex_count(), 8);
    assert_eq!(foam.edge_count(), 12);
    assert_eq!(foam.face_count(), 6);
    assert_eq!(foam.cell_count(), 1);

    for max_steps in [0, 1, 10, 1000] {
        let report = foam.planarize(max_steps, 1e-6, &NeverCancel).unwrap();
        assert_eq!(report.status, RelaxStatus::Converged);
        assert_eq!(report.iterations, 0);
        assert_eq!(foam.max_deviation, 0.0);
    }
}

#[test]
fn perturbed_tetrahedron_converges() {
    let mut foam = perturbed_tetrahedron();
    assert_eq!(foam.vertex_count(), 4);
    assert_eq!(foam.edge_count(), 6);
    assert_eq!(foam.face_count(), 4);
    assert_eq!(foam.cell_count(), 1);

    let report = foam.planarize(1000, 1e-6, &NeverCancel).unwrap();
    assert_eq!(report.status, RelaxStatus::Converged);
    assert!(report.iterations < 1000);
    assert!(foam.max_deviation <= 1e-6);
}

#[test]
fn warped_cube_flattens_with_default_config() {
    let config = SolverConfig::default();
    let mut foam = warped_cube();
    let report = foam
        .planarize(config.max_steps, config.max_deviation, &NeverCancel)
        .unwrap();
    assert_eq!(report.status, RelaxStatus::Converged);
    assert!(report.history[0] > report.max_deviation);
    assert!(foam.faces().all(|f| f.deviation <= config.max_deviation));
}

#[test]
fn planarize_residual_never_rises() {
    for (i, amplitude) in [0.05, 0.2, 0.5, 1.0].into_iter().enumerate() {
        let mut foam = jittered_grid([3, 2, 2], amplitude, i as f64 * 1.7);
        let report = foam.planarize(300, 1e-12, &NeverCancel).unwrap();
        assert!(
            report.history.windows(2).all(|w| w[1] <= w[0]),
            "amplitude {amplitude}: {:?}",
            report.history
        );
        assert!(report.max_deviation <= report.history[0]);
    }
}

#[test]
fn cancellation_matches_step_limit() {
    const K: usize = 3;

    let mut cancelled = warped_cube();
    let polls = Cell::new(0);
    let after_k = || {
        polls.set(polls.get() + 1);
        polls.get() > K
    };
    let report = cancelled.planarize(1000, 1e-12, &after_k).unwrap();
    assert_eq!(report.status, RelaxStatus::Cancelled);
    assert_eq!(report.iterations, K);

    let mut limited = warped_cube();
    let limit = limited.planarize(K, 1e-12, &NeverCancel).unwrap();
    assert_eq!(limit.status, RelaxStatus::StepLimitReached);
    assert_eq!(limit.history, report.history);
    assert_eq!(positions(&cancelled), positions(&limited));
}

#[test]
fn raised_flag_cancels_before_first_step() {
    let mut foam = warped_cube();
    let before = positions(&foam);
    let report = foam
        .planarize_soft(100, 1e-9, &AtomicBool::new(true))
        .unwrap();
    assert_eq!(report.status, RelaxStatus::Cancelled);
    assert_eq!(report.iterations, 0);
    assert_eq!(positions(&foam), before);
}

#[test]
fn soft_planarize_never_moves_fixed_vertices() {
    let mut foam = warped_cube();
    let pinned = [
        vertex_at(&foam, Point3::new(0.0, 0.0, 0.0)),
        vertex_at(&foam, Point3::new(1.1, 1.05, 1.15)),
    ];
    for &v in &pinned {
        foam.fix_vertex(v).unwrap();
    }
    let before: Vec<_> = pinned.iter().map(|&v| foam.position(v).unwrap()).collect();

    foam.planarize_soft(2000, 1e-6, &NeverCancel).unwrap();
    let after: Vec<_> = pinned.iter().map(|&v| foam.position(v).unwrap()).collect();
    assert_eq!(before, after);
}

#[test]
fn perp_soft_reduces_angle_and_keeps_min_length() {
    let (mut primal, dual, _) = skewed_corner_pair();
    for e in primal.edges_mut() {
        e.min_length = 0.9;
    }
    let start = primal.measure_perpendicularity(&dual).unwrap();

    let report = primal.perp_soft(&dual, 3000, 1e-4, &NeverCancel).unwrap();
    assert!(report.max_deviation < start);
    for e in primal.edges() {
        assert!(e.length >= 0.9 - 1e-12, "edge {} is {}", e.id, e.length);
    }
}

#[test]
fn perp_soft_needs_connected_dual() {
    let (mut primal, dual, _) = corner_pair();
    assert!(primal.perp_soft(&dual, 10, 1e-4, &NeverCancel).is_err());
}
