//! Reference snowcover time integrator
//!
//! Advances a cell across one data interval using mass-threshold timestep
//! subdivision: thin packs are integrated on shorter sub-steps so a single
//! step cannot melt or evaporate more than a layer holds.
//!
//! # Step Structure
//!
//! 1. Precipitation for the interval is added to the pack.
//! 2. For each sub-step: forcing is interpolated to the sub-step start, the
//!    point energy balance is evaluated, running averages are updated, and the
//!    energy and mass changes are applied to the layers.
//! 3. The model clock advances by the data interval.
//!
//! Energy surplus beyond a layer's cold content melts snow. Surplus a layer
//! cannot use once its ice is gone passes to the other layer; liquid water
//! beyond the pack's retention capacity leaves as runoff.

use super::context::CellContext;
use super::r#trait::{StepOutcome, TimeIntegrator};
use crate::config::ModelParams;
use crate::core_types::constants::{cp_ice, lh_fus, FREEZE};
use crate::core_types::{EnergySums, Precipitation, SnowState};
use crate::physics::layers::{self, EMPTY_LAYER_TEMP};
use crate::physics::{energy_balance, EnergyBudget, PointError, SurfaceExchange};
use tracing::{debug, trace};

/// Standard snobal-style integrator
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceIntegrator;

/// Mass of the lightest active layer, or infinity without a snowcover
fn lightest_layer(state: &SnowState) -> f64 {
    match state.layer_count {
        0 => f64::INFINITY,
        1 => state.m_s_0,
        _ => state.m_s_0.min(state.m_s_l),
    }
}

/// Add the interval's precipitation, returning mass that ran straight off
///
/// Snow enters at the surface temperature; the heat it carries is accounted
/// for by the advection term instead.
fn add_precipitation(
    state: &mut SnowState,
    precip: &Precipitation,
    params: &ModelParams,
    min_mass: f64,
) -> f64 {
    if !precip.is_falling() {
        return 0.0;
    }

    let m_snow = precip.m_snow();
    let m_rain = precip.m_rain();

    if m_snow > 0.0 {
        let z_snow = m_snow / precip.rho_snow;
        if state.has_snowcover() {
            state.z_s += z_snow;
            state.m_s += m_snow;
            state.rho = state.m_s / state.z_s;
        } else {
            let t_snow = precip.t_snow();
            state.z_s = z_snow;
            state.m_s = m_snow;
            state.rho = precip.rho_snow;
            state.t_s_0 = t_snow;
            state.t_s_l = t_snow;
            state.t_s = t_snow;
            state.h2o = 0.0;
        }
    }

    let mut runoff = 0.0;
    if m_rain > 0.0 {
        if state.m_s > 0.0 && state.z_s > 0.0 {
            state.h2o += m_rain;
            state.m_s += m_rain;
            state.rho = state.m_s / state.z_s;
        } else {
            runoff += m_rain;
        }
    }

    if state.m_s > 0.0 {
        runoff += layers::adjust_layers(state, params, min_mass);
    }
    runoff
}

/// Fold `value` into a time-weighted average covering `elapsed` seconds
#[inline]
fn weighted(average: f64, elapsed: f64, value: f64, dt: f64) -> f64 {
    (average * elapsed + value * dt) / (elapsed + dt)
}

fn accumulate(sums: &mut EnergySums, budget: &EnergyBudget, elapsed: f64, dt: f64) {
    sums.r_n_bar = weighted(sums.r_n_bar, elapsed, budget.r_n, dt);
    sums.h_bar = weighted(sums.h_bar, elapsed, budget.h, dt);
    sums.l_v_e_bar = weighted(sums.l_v_e_bar, elapsed, budget.l_v_e, dt);
    sums.g_bar = weighted(sums.g_bar, elapsed, budget.g, dt);
    sums.g_0_bar = weighted(sums.g_0_bar, elapsed, budget.g_0, dt);
    sums.m_bar = weighted(sums.m_bar, elapsed, budget.m, dt);
    sums.delta_q_bar = weighted(sums.delta_q_bar, elapsed, budget.delta_q, dt);
    sums.delta_q_0_bar = weighted(sums.delta_q_0_bar, elapsed, budget.delta_q_0, dt);
}

/// Add energy to a layer's cold content, returning the surplus (J/m²)
#[inline]
fn absorb(cold_content: &mut f64, energy: f64) -> f64 {
    let total = *cold_content + energy;
    if total > 0.0 {
        *cold_content = 0.0;
        total
    } else {
        *cold_content = total;
        0.0
    }
}

/// Melt from `surplus` energy limited to `cap` ice, returning (melt, leftover)
#[inline]
fn melt_within(surplus: f64, cap: f64, lf: f64) -> (f64, f64) {
    let cap = cap.max(0.0);
    let melt = surplus / lf;
    if melt > cap {
        (cap, surplus - cap * lf)
    } else {
        (melt, 0.0)
    }
}

/// Layer temperature implied by its cold content
fn layer_temperature(cold_content: f64, mass: f64, previous: f64) -> f64 {
    if cold_content >= 0.0 || mass <= 0.0 {
        return FREEZE;
    }
    (FREEZE + cold_content / (cp_ice(previous) * mass)).max(EMPTY_LAYER_TEMP)
}

/// Mass changes from one sub-step's budget
#[derive(Debug, Default)]
struct SubStepMass {
    melt: f64,
    runoff: f64,
    evaporation: f64,
    /// Energy left after all available ice melted (J/m²)
    unused_energy: f64,
}

/// Apply one sub-step's energy and mass fluxes to an active snowcover
fn apply_budget(
    state: &mut SnowState,
    budget: &EnergyBudget,
    dt: f64,
    params: &ModelParams,
    min_mass: f64,
) -> SubStepMass {
    let lf = lh_fus(FREEZE);

    let (q_0, q_l) = if state.layer_count == 2 {
        (
            budget.delta_q_0 * dt,
            (budget.delta_q - budget.delta_q_0) * dt,
        )
    } else {
        (budget.delta_q * dt, 0.0)
    };

    // Surplus energy melts ice, up to what the layer holds
    let ice = (state.m_s - state.h2o).max(0.0);
    let cap_0 = state.m_s_0.min(ice);
    let (mut melt_0, mut unused_energy) =
        melt_within(absorb(&mut state.cc_s_0, q_0), cap_0, lf);
    let mut melt_l = 0.0;

    if state.layer_count == 2 {
        let cap_l = state.m_s_l.min(ice - melt_0);
        let surplus_l = absorb(&mut state.cc_s_l, q_l + unused_energy);
        (melt_l, unused_energy) = melt_within(surplus_l, cap_l, lf);

        // Lower layer exhausted: the rest goes back to the surface
        if unused_energy > 0.0 {
            let cap = (cap_0 - melt_0).min(ice - melt_0 - melt_l);
            let (extra, left) = melt_within(absorb(&mut state.cc_s_0, unused_energy), cap, lf);
            melt_0 += extra;
            unused_energy = left;
        }
    }

    if unused_energy > 0.0 {
        debug!(unused_energy, "energy left after the snowcover melted");
    }

    let melt = melt_0 + melt_l;
    state.h2o += melt;

    // Liquid water refreezes into a cold surface layer
    if state.cc_s_0 < 0.0 && state.h2o > 0.0 {
        let frozen = state.h2o.min(-state.cc_s_0 / lf);
        state.h2o -= frozen;
        state.cc_s_0 += frozen * lf;
    }

    state.t_s_0 = layer_temperature(state.cc_s_0, state.m_s_0, state.t_s_0);
    if state.layer_count == 2 {
        state.t_s_l = layer_temperature(state.cc_s_l, state.m_s_l, state.t_s_l);
    }

    // Evaporation cannot remove more than the pack holds
    let evaporation = (budget.e * dt).max(-state.m_s);
    state.m_s += evaporation;
    state.h2o = state.h2o.min(state.m_s);

    let runoff = layers::adjust_layers(state, params, min_mass);

    SubStepMass {
        melt,
        runoff,
        evaporation,
        unused_energy,
    }
}

impl TimeIntegrator for ReferenceIntegrator {
    fn step(
        &self,
        ctx: &mut CellContext<'_>,
        exchange: &dyn SurfaceExchange,
    ) -> Result<StepOutcome, PointError> {
        let data_step = ctx.timestep.data_step;
        let min_mass = ctx.timestep.min_snow_mass();
        let mut outcome = StepOutcome::default();

        // Averages and totals restart once a full output interval is complete
        if ctx.time_since_out >= data_step {
            ctx.sums.reset();
            ctx.time_since_out = 0.0;
        }

        let runoff = add_precipitation(&mut ctx.state, &ctx.precip, ctx.params, min_mass);
        ctx.sums.ro_pred_sum += runoff;
        outcome.runoff += runoff;

        let mut elapsed = 0.0;
        while elapsed < data_step {
            let dt = ctx
                .timestep
                .step_for(lightest_layer(&ctx.state))
                .min(data_step - elapsed);
            if dt <= 0.0 {
                break;
            }

            let met = ctx.input1.interpolate(&ctx.input2, elapsed / data_step);
            let budget = energy_balance(
                &ctx.state,
                &met,
                &ctx.precip,
                data_step,
                ctx.params,
                exchange,
            )?;

            accumulate(&mut ctx.sums, &budget, ctx.time_since_out, dt);
            ctx.time_since_out += dt;

            if ctx.state.has_snowcover() {
                let mass = apply_budget(&mut ctx.state, &budget, dt, ctx.params, min_mass);
                ctx.sums.melt_sum += mass.melt;
                ctx.sums.ro_pred_sum += mass.runoff;
                ctx.sums.e_s_sum += mass.evaporation;
                outcome.melt += mass.melt;
                outcome.runoff += mass.runoff;
                outcome.evaporation += mass.evaporation;
                outcome.unused_energy += mass.unused_energy;
            }

            trace!(
                elapsed,
                dt,
                delta_q = budget.delta_q,
                layers = ctx.state.layer_count,
                "sub-step complete"
            );

            elapsed += dt;
            outcome.sub_steps += 1;
            outcome.budget = budget;
        }

        ctx.current_time += data_step;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimestepConfig;
    use crate::core_types::PointMeteorology;
    use crate::physics::SnobalExchange;
    use approx::assert_relative_eq;

    fn met(t_a: f64, s_n: f64) -> PointMeteorology {
        PointMeteorology {
            i_lw: 260.0,
            t_a,
            e_a: 350.0,
            u: 4.0,
            t_g: 272.15,
            s_n,
        }
    }

    fn pack(z_s: f64, rho: f64, t: f64, params: &ModelParams, steps: &TimestepConfig) -> SnowState {
        let mut state = SnowState {
            z_0: 0.005,
            z_s,
            rho,
            t_s_0: t,
            t_s_l: t,
            t_s: t,
            p_a: 75_000.0,
            ..SnowState::default()
        };
        layers::init_snow(&mut state, params, steps.min_snow_mass());
        state
    }

    #[test]
    fn test_deep_pack_uses_data_step() {
        let params = ModelParams::default();
        let steps = TimestepConfig::default();
        let state = pack(1.5, 300.0, 265.15, &params, &steps);
        let mut ctx = CellContext::new(
            state,
            met(268.15, 0.0),
            met(269.15, 100.0),
            Precipitation::default(),
            &params,
            &steps,
        );

        let outcome = ReferenceIntegrator.step(&mut ctx, &SnobalExchange).unwrap();
        assert_eq!(outcome.sub_steps, 1);
        assert_eq!(ctx.current_time, 3600.0);
        assert_eq!(ctx.time_since_out, 3600.0);
        assert_relative_eq!(ctx.sums.h_bar, outcome.budget.h, max_relative = 1e-12);
    }

    #[test]
    fn test_thin_pack_subdivides_step() {
        let params = ModelParams::default();
        let steps = TimestepConfig::default();

        // 0.05 m at 150 kg/m³ is 7.5 kg/m²: medium threshold crossed, small not
        let state = pack(0.05, 150.0, 265.15, &params, &steps);
        let mut ctx = CellContext::new(
            state,
            met(266.15, 0.0),
            met(266.15, 0.0),
            Precipitation::default(),
            &params,
            &steps,
        );

        let outcome = ReferenceIntegrator.step(&mut ctx, &SnobalExchange).unwrap();
        assert!(outcome.sub_steps >= 4, "got {} sub-steps", outcome.sub_steps);
        assert_relative_eq!(ctx.time_since_out, 3600.0);
    }

    #[test]
    fn test_mass_is_conserved() {
        let params = ModelParams::default();
        let steps = TimestepConfig::default();
        let state = pack(0.8, 280.0, 271.15, &params, &steps);
        let mass_before = state.m_s;

        let precip = Precipitation {
            m_pp: 6.0,
            percent_snow: 0.5,
            rho_snow: 120.0,
            t_pp: 273.65,
        };
        let mut ctx = CellContext::new(
            state,
            met(274.15, 500.0),
            met(275.15, 600.0),
            precip,
            &params,
            &steps,
        );

        ReferenceIntegrator.step(&mut ctx, &SnobalExchange).unwrap();

        let expected = mass_before + precip.m_pp + ctx.sums.e_s_sum - ctx.sums.ro_pred_sum;
        assert_relative_eq!(ctx.state.m_s, expected, max_relative = 1e-9);
        assert!(ctx.sums.melt_sum > 0.0, "warm sunny hour should melt snow");
    }

    #[test]
    fn test_rain_on_bare_ground_runs_off() {
        let params = ModelParams::default();
        let steps = TimestepConfig::default();
        let state = SnowState {
            z_0: 0.005,
            p_a: 75_000.0,
            ..SnowState::default()
        };
        let rain = Precipitation {
            m_pp: 4.0,
            percent_snow: 0.0,
            rho_snow: 0.0,
            t_pp: 278.15,
        };
        let mut ctx = CellContext::new(
            state,
            met(278.15, 0.0),
            met(278.15, 0.0),
            rain,
            &params,
            &steps,
        );

        let outcome = ReferenceIntegrator.step(&mut ctx, &SnobalExchange).unwrap();
        assert_eq!(outcome.runoff, 4.0);
        assert_eq!(ctx.sums.ro_pred_sum, 4.0);
        assert!(!ctx.state.has_snowcover());
        assert_eq!(outcome.budget, EnergyBudget::default());
    }

    #[test]
    fn test_snowfall_builds_new_pack() {
        let params = ModelParams::default();
        let steps = TimestepConfig::default();
        let state = SnowState {
            z_0: 0.005,
            p_a: 75_000.0,
            ..SnowState::default()
        };
        let snow = Precipitation {
            m_pp: 20.0,
            percent_snow: 1.0,
            rho_snow: 100.0,
            t_pp: 266.15,
        };
        let mut ctx = CellContext::new(
            state,
            met(266.15, 0.0),
            met(266.15, 0.0),
            snow,
            &params,
            &steps,
        );

        ReferenceIntegrator.step(&mut ctx, &SnobalExchange).unwrap();
        assert!(ctx.state.has_snowcover());
        assert_eq!(ctx.state.layer_count, 1);
        assert!(ctx.state.t_s_0 < FREEZE);
    }

    #[test]
    fn test_averages_restart_after_output_interval() {
        let params = ModelParams::default();
        let steps = TimestepConfig::default();
        let state = pack(1.5, 300.0, 265.15, &params, &steps);
        let mut ctx = CellContext::new(
            state,
            met(268.15, 0.0),
            met(268.15, 0.0),
            Precipitation::default(),
            &params,
            &steps,
        );
        ctx.time_since_out = 3600.0;
        ctx.sums.melt_sum = 99.0;
        ctx.sums.h_bar = 1.0e6;

        let outcome = ReferenceIntegrator.step(&mut ctx, &SnobalExchange).unwrap();
        assert_eq!(ctx.sums.melt_sum, outcome.melt);
        assert_relative_eq!(ctx.sums.h_bar, outcome.budget.h, max_relative = 1e-12);
    }

    #[test]
    fn test_melt_cap_keeps_surplus_energy() {
        let params = ModelParams::default();
        let steps = TimestepConfig::default();
        let lf = lh_fus(FREEZE);

        // 7.5 kg/m² in one layer, given far more energy than it can use
        let mut state = pack(0.05, 150.0, 268.15, &params, &steps);
        assert_eq!(state.layer_count, 1);
        let ice = state.m_s;
        let available = 1.0e6 * 60.0 + state.cc_s_0;
        let budget = EnergyBudget {
            delta_q: 1.0e6,
            delta_q_0: 1.0e6,
            ..EnergyBudget::default()
        };

        let mass = apply_budget(&mut state, &budget, 60.0, &params, steps.min_snow_mass());
        assert_relative_eq!(mass.melt, ice, max_relative = 1e-12);
        assert!(mass.unused_energy > 0.0);
        assert_relative_eq!(
            mass.melt * lf + mass.unused_energy,
            available,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_surface_surplus_passes_to_lower_layer() {
        let params = ModelParams::default();
        let steps = TimestepConfig::default();
        let lf = lh_fus(FREEZE);

        let mut state = pack(1.0, 300.0, 268.15, &params, &steps);
        assert_eq!(state.layer_count, 2);
        let m_s_0 = state.m_s_0;
        let available = 1.0e4 * 3600.0 + state.cc_s_0 + state.cc_s_l;

        // Enough to melt the whole surface layer with some left for the lower one
        let budget = EnergyBudget {
            delta_q: 1.0e4,
            delta_q_0: 1.0e4,
            ..EnergyBudget::default()
        };

        let mass = apply_budget(&mut state, &budget, 3600.0, &params, steps.min_snow_mass());
        assert!(mass.melt > m_s_0, "melt {} stopped at the surface layer", mass.melt);
        assert_relative_eq!(mass.unused_energy, 0.0, epsilon = 1e-3);
        assert_relative_eq!(
            mass.melt * lf + mass.unused_energy,
            available,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_time_weighted_average() {
        assert_eq!(weighted(0.0, 0.0, 10.0, 60.0), 10.0);
        assert_eq!(weighted(10.0, 60.0, 20.0, 60.0), 15.0);
    }
}
