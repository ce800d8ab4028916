//! The k-NN density engine (§4.5): per-row density estimation from
//! VP-tree queries, density-column normalisation, quantile and
//! inverse-quantile queries, NA-aware nearest-neighbour lookup, and
//! record completion.
//!
//! Grounded on `original_source/src/density.h`'s
//! `calculateKNearestNeighborDensityEstimation`/`calculateQuantile`/
//! `calculateInverseQuantile`; `k_nearest_neighbors`/`complete` extend
//! that file's `calculateDensityValue` pattern (normalise the query,
//! search the tree or fall back to a linear scan) to the NA-aware
//! record queries spec.md describes in the same section, which were not
//! present in the retained original source.

use crate::column::Column;
use crate::datasource::normalize;
use crate::datasource::DataSource;
use crate::error::{Error, Result};
use crate::index::{LpDistance, VpElement, VpTree};
use crate::platform::Progress;

/// Unit-ball volume `V_d = pi^(d/2) / Gamma(d/2 + 1)`, via a Lanczos
/// approximation of `ln Gamma` rather than naive factorials — `d` can run
/// into the hundreds once NOMINAL columns with many categories are in
/// play, and `(2m)!` overflows `f64` long before that.
fn unit_ball_volume(dimension: usize) -> f32 {
    let d = dimension as f64;
    ((d / 2.0) * std::f64::consts::PI.ln() - ln_gamma(d / 2.0 + 1.0)).exp() as f32
}

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEF: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1259.139_216_722_402_8,
    771.323_428_777_653_13,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        (std::f64::consts::PI / (std::f64::consts::PI * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let t = x + LANCZOS_G + 0.5;
        let mut a = LANCZOS_COEF[0];
        for (i, &c) in LANCZOS_COEF.iter().enumerate().skip(1) {
            a += c / (x + i as f64);
        }
        0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
    }
}

/// `rho = k / (N * V_d) / r_k^d`, using the returned hit count as `k`
/// (fewer than requested is possible near `N`) and the farthest hit's
/// distance as `r_k`. Zero when the hit list is empty (an all-inactive
/// or single-row data source).
fn knn_density_estimate(hits: &[VpElement], n: usize, dimension: usize) -> f32 {
    let Some(farthest) = hits.last() else {
        return 0.0;
    };
    let c = hits.len() as f32 / n as f32 / unit_ball_volume(dimension);
    c / farthest.distance.powi(dimension as i32)
}

/// `calculate_density_values`: for every normalised row, query `k`
/// nearest neighbours, estimate density, then normalise the resulting
/// density column logarithmically and drop its raw vector (§4.5 step 3).
/// Fails with `InvalidDensity` if any estimate is infinite; the density
/// column is left untouched on any failure, including a progress abort.
pub fn calculate_density_values(
    data_source: &mut DataSource,
    vp_tree: &VpTree,
    k: usize,
    progress: &dyn Progress,
) -> Result<()> {
    let n = data_source.normalized_size();
    let dimension = data_source.dimension();
    log::debug!("calculate_density_values: {n} rows, dimension {dimension}, k={k}");
    progress.start(n);
    let mut densities = Vec::with_capacity(n);
    for i in 0..n {
        let target = data_source.get_normalized_number_vector_reference(i)?;
        let hits = vp_tree.search(target, k, data_source.normalized_cache())?;
        let d = knn_density_estimate(&hits, n, dimension);
        if d.is_infinite() {
            return Err(Error::invalid_density(format!(
                "row {i} produced an infinite k-NN density estimate"
            )));
        }
        densities.push(d);
        if progress.update(i + 1, n) == crate::platform::ProgressSignal::Abort {
            return Err(Error::invalid_operation(
                "density calculation aborted by progress sink",
            ));
        }
    }
    let density_column = data_source.density_column_mut();
    density_column.clear();
    for d in densities {
        density_column.add_value(d);
    }
    density_column.normalize(true);
    density_column.drop_raw();
    progress.finish();
    log::debug!("calculate_density_values: done, {n} densities normalized");
    Ok(())
}

/// `calculate_density_value`: normalise a caller-supplied raw vector,
/// search (tree or linear scan per `use_tree`), estimate density, and map
/// the result through the density column's own normalisation (clamped).
pub fn calculate_density_value(
    data_source: &DataSource,
    vp_tree: &VpTree,
    number_vector: &[f32],
    k: usize,
    use_tree: bool,
) -> Result<f32> {
    let normalized = normalize::get_normalized_number_vector(data_source, number_vector)?;
    let hits = search(vp_tree, &normalized, k, data_source, use_tree)?;
    let n = data_source.density_column().norm_size();
    let dimension = data_source.dimension();
    let d = knn_density_estimate(&hits, n, dimension);
    Ok(data_source.density_column().normalize_value_limit(d, true))
}

/// Rank `max(0, floor(percent/100 * n)) - 1` (clamped into range) of the
/// normalised density vector, via partial selection. Fails with
/// `NoDensities` if the density pass has not been run.
pub fn calculate_quantile(data_source: &DataSource, percent: f32) -> Result<f32> {
    let densities = data_source.density_column().normalized();
    if densities.is_empty() {
        return Err(Error::NoDensities);
    }
    let n = densities.len();
    let rank = ((percent as f64 / 100.0) * n as f64).floor() as i64 - 1;
    let rank = rank.clamp(0, n as i64 - 1) as usize;
    let mut scratch = densities.to_vec();
    scratch.select_nth_unstable_by(rank, f32::total_cmp);
    Ok(scratch[rank])
}

/// Fraction (times 100) of normalised density entries `<= value`. Mirrors
/// `density.h::calculateInverseQuantile`, which returns `0` rather than
/// failing when no densities have been computed yet.
pub fn calculate_inverse_quantile(data_source: &DataSource, value: f32) -> f32 {
    let densities = data_source.density_column().normalized();
    if densities.is_empty() {
        return 0.0;
    }
    let count = densities.iter().filter(|&&d| d <= value).count();
    count as f32 / densities.len() as f32 * 100.0
}

/// Parse a record's cells into a raw feature vector, one cell per active
/// column: NUMERICAL reads as a float (`"NA"` as NaN), NUMERICAL_ARRAY
/// reads a slot name and maps it to a one-hot block (all-NaN for
/// `"NA"`). STRING columns are not supported here — generative data never
/// holds one, and the record-query surface (`k_nearest_neighbors`,
/// `complete`) only ever runs against it.
fn parse_record_vector(data_source: &DataSource, record: &[String]) -> Result<Vec<f32>> {
    let active: Vec<&Column> = data_source.columns().iter().filter(|c| c.active()).collect();
    if record.len() != active.len() {
        return Err(Error::different_sizes(format!(
            "record has {} cells, data source has {} active columns",
            record.len(),
            active.len()
        )));
    }
    let mut out = Vec::with_capacity(data_source.dimension());
    for (column_i, (column, cell)) in active.iter().zip(record).enumerate() {
        match column {
            Column::Number(_) => {
                let v = if cell == "NA" {
                    f32::NAN
                } else {
                    cell.parse::<f32>()
                        .map_err(|_| Error::parse_error(column_i, cell.clone()))?
                };
                out.push(v);
            }
            Column::Array(arr) => out.extend(arr.normalized_one_hot_by_name(cell)),
            Column::String(_) => {
                return Err(Error::invalid_column_type(
                    "k_nearest_neighbors/complete only support NUMERICAL and NUMERICAL_ARRAY columns",
                ))
            }
        }
    }
    Ok(out)
}

/// Denormalise row `i` into host-facing record cells: NUMERICAL columns
/// through their scale's inverse, NUMERICAL_ARRAY columns via
/// `get_max_value`. Shared by [`crate::generative::data::GenerativeData::get_row`]
/// and the nearest-neighbour record queries below.
pub fn denormalize_record_row(data_source: &DataSource, row_i: usize) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for column in data_source.columns().iter().filter(|c| c.active()) {
        match column {
            Column::Number(c) => {
                let [v] = c.denormalized_number_vec(row_i)?;
                out.push(if v.is_nan() { "NA".to_string() } else { v.to_string() });
            }
            Column::Array(c) => out.push(c.get_max_value(row_i)?),
            Column::String(_) => {
                return Err(Error::invalid_column_type(
                    "k_nearest_neighbors/complete only support NUMERICAL and NUMERICAL_ARRAY columns",
                ))
            }
        }
    }
    Ok(out)
}

fn search(
    vp_tree: &VpTree,
    normalized: &[f32],
    k: usize,
    data_source: &DataSource,
    use_tree: bool,
) -> Result<Vec<VpElement>> {
    if use_tree && vp_tree.is_built() {
        vp_tree.search(normalized, k, data_source.normalized_cache())
    } else {
        vp_tree.linear_search(normalized, k, data_source.normalized_cache())
    }
}

/// `k_nearest_neighbors(record, k, use_tree)`: parse and normalise the
/// record, rebuild `tree` in place with an `L2DistanceNanIndexed` mask
/// whenever its carried NaN pattern differs from this query's (§4.4's
/// state machine), then search and denormalise each hit back into a
/// record. `max_nearest_neighbors` (`VpTreeConfig::max_nearest_neighbors`,
/// §4.4's `MAX_NN`) is applied to a freshly built tree.
pub fn k_nearest_neighbors(
    data_source: &DataSource,
    tree: &mut VpTree,
    record: &[String],
    k: usize,
    use_tree: bool,
    max_nearest_neighbors: usize,
    progress: &dyn Progress,
) -> Result<Vec<Vec<String>>> {
    let raw = parse_record_vector(data_source, record)?;
    let mask = normalize::get_normalized_number_vector(data_source, &raw)?;

    if use_tree && (!tree.is_built() || !tree.distance().mask_matches(&mask)) {
        log::warn!("k_nearest_neighbors: query NaN pattern differs from the built tree's mask, rebuilding");
        let distance = LpDistance::L2DistanceNanIndexed { mask: mask.clone() };
        *tree = VpTree::build(data_source.normalized_cache(), distance, progress)?;
        tree.set_max_nearest_neighbors(max_nearest_neighbors);
    }

    let hits = if use_tree {
        tree.search(&mask, k, data_source.normalized_cache())?
    } else {
        let distance = LpDistance::L2DistanceNanIndexed { mask: mask.clone() };
        VpTree::empty(distance).linear_search(&mask, k, data_source.normalized_cache())?
    };

    hits.iter()
        .map(|hit| denormalize_record_row(data_source, hit.index))
        .collect()
}

/// `complete(record)`: fetch the single nearest neighbour under the
/// record's own NaN mask, then for each field keep the input unless it
/// was `"NA"`, substituting the neighbour's value there.
pub fn complete(
    data_source: &DataSource,
    tree: &mut VpTree,
    record: &[String],
    use_tree: bool,
    max_nearest_neighbors: usize,
    progress: &dyn Progress,
) -> Result<Vec<String>> {
    let neighbors =
        k_nearest_neighbors(data_source, tree, record, 1, use_tree, max_nearest_neighbors, progress)?;
    if neighbors.len() != 1 {
        return Err(Error::invalid_operation(format!(
            "expected exactly one nearest neighbor, got {}",
            neighbors.len()
        )));
    }
    let neighbor = &neighbors[0];
    if neighbor.len() != record.len() {
        return Err(Error::different_sizes(format!(
            "neighbor record has {} fields, input record has {}",
            neighbor.len(),
            record.len()
        )));
    }
    Ok(record
        .iter()
        .zip(neighbor)
        .map(|(input, candidate)| if input == "NA" { candidate.clone() } else { input.clone() })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::NullProgress;
    use crate::types::ColumnType;

    fn grid_source() -> DataSource {
        let mut ds = DataSource::new(
            &[ColumnType::Numerical, ColumnType::Numerical],
            &["x".to_string(), "y".to_string()],
        );
        for i in 0..200 {
            let x = (i % 20) as f32;
            let y = (i / 20) as f32;
            ds.add_value_row(&[x.to_string(), y.to_string()]).unwrap();
        }
        crate::datasource::normalize::normalize(&mut ds, true).unwrap();
        ds.build_normalized_number_vector_vector().unwrap();
        ds
    }

    #[test]
    fn unit_ball_volume_matches_known_values() {
        // V_1 = 2, V_2 = pi, V_3 = 4/3 pi
        assert!((unit_ball_volume(1) - 2.0).abs() < 1e-4);
        assert!((unit_ball_volume(2) - std::f32::consts::PI).abs() < 1e-4);
        assert!((unit_ball_volume(3) - (4.0 / 3.0) * std::f32::consts::PI).abs() < 1e-3);
    }

    #[test]
    fn density_pass_yields_values_in_unit_range() {
        let mut ds = grid_source();
        let tree = VpTree::build(ds.normalized_cache(), LpDistance::L2, &NullProgress).unwrap();
        calculate_density_values(&mut ds, &tree, 10, &NullProgress).unwrap();
        let densities = ds.density_column().normalized();
        assert_eq!(densities.len(), 200);
        for &d in densities {
            assert!(d.is_finite());
            assert!((0.0..=1.0).contains(&d));
        }
    }

    #[test]
    fn quantile_is_monotonic_and_inverse_quantile_round_trips() {
        let mut ds = grid_source();
        let tree = VpTree::build(ds.normalized_cache(), LpDistance::L2, &NullProgress).unwrap();
        calculate_density_values(&mut ds, &tree, 10, &NullProgress).unwrap();

        let q25 = calculate_quantile(&ds, 25.0).unwrap();
        let q75 = calculate_quantile(&ds, 75.0).unwrap();
        assert!(q25 <= q75);

        let q50 = calculate_quantile(&ds, 50.0).unwrap();
        let inv = calculate_inverse_quantile(&ds, q50);
        assert!((inv - 50.0).abs() <= 100.0 / 200.0 * 2.0 + 1.0);
    }

    #[test]
    fn quantile_without_densities_fails() {
        let ds = grid_source();
        assert!(matches!(calculate_quantile(&ds, 50.0), Err(Error::NoDensities)));
        assert_eq!(calculate_inverse_quantile(&ds, 0.5), 0.0);
    }

    #[test]
    fn complete_fills_missing_coordinate_from_nearest_neighbor() {
        let ds = grid_source();
        let mut tree = VpTree::empty(LpDistance::L2);
        let record = vec!["5.0".to_string(), "NA".to_string()];
        let completed = complete(&ds, &mut tree, &record, true, 128, &NullProgress).unwrap();
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0], "5");
        assert_ne!(completed[1], "NA");
    }

    #[test]
    fn k_nearest_neighbors_rejects_wrong_record_arity() {
        let ds = grid_source();
        let mut tree = VpTree::empty(LpDistance::L2);
        let record = vec!["5.0".to_string()];
        assert!(matches!(
            k_nearest_neighbors(&ds, &mut tree, &record, 3, true, 128, &NullProgress),
            Err(Error::DifferentSizes(_))
        ));
    }
}
