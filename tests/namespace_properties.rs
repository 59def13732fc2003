// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Property tests for parameter namespace merging

use dendrify::prelude::*;
use dendrify::units::units;
use proptest::prelude::*;

fn passive(capacitance_pf: f64) -> PassiveProperties {
    PassiveProperties::new()
        .capacitance(capacitance_pf * units::PICOFARAD)
        .leak_conductance(2.0 * units::NANOSIEMENS)
        .leak_reversal(-70.0 * units::MILLIVOLT)
}

/// Soma at 200 pF with one dendrite per entry, each hanging off the soma
fn star(capacitances: &[f64], policy: NamespacePolicy) -> ModelDescriptor {
    let mut builder = NeuronModelBuilder::new("star", 1)
        .namespace_policy(policy)
        .add(CompartmentSpec::soma("soma", Geometry::point(), passive(200.0)).unwrap())
        .unwrap();
    for (i, c) in capacitances.iter().enumerate() {
        let name = format!("d{}", i);
        builder = builder
            .add(CompartmentSpec::dendrite(name.as_str(), Geometry::point(), passive(*c)).unwrap())
            .unwrap()
            .connect("soma", &name, Coupling::Resistance(40.0 * units::MEGAOHM))
            .unwrap();
    }
    builder.compile(PopulationOptions::new()).unwrap()
}

proptest! {
    #[test]
    fn identical_values_are_shared(capacitances in prop::collection::vec(prop::sample::select(vec![50.0, 75.0]), 1..6)) {
        let model = star(&capacitances, NamespacePolicy::ShareIdentical);
        let ns = model.namespace();

        // g_L and E_L agree everywhere, capacitances never agree with the soma
        prop_assert!(ns.contains_key("g_L") && ns.contains_key("E_L"));
        prop_assert!(!ns.contains_key("C"));
        for (i, c) in capacitances.iter().enumerate() {
            prop_assert_eq!(ns[&format!("C_d{}", i)], *c * units::PICOFARAD);
        }
        let n = capacitances.len();
        prop_assert_eq!(ns.len(), (n + 1) + 2);
    }

    #[test]
    fn always_qualify_never_shares(capacitances in prop::collection::vec(prop::sample::select(vec![50.0, 75.0]), 1..6)) {
        let model = star(&capacitances, NamespacePolicy::AlwaysQualify);
        let ns = model.namespace();
        prop_assert!(!ns.contains_key("g_L") && !ns.contains_key("E_L"));
        let n = capacitances.len();
        prop_assert_eq!(ns.len(), 3 * (n + 1));
        prop_assert_eq!(model.axial_residual(), Some(Default::default()));
    }
}
