// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Composition of predict/invert/residual task graphs over partitioned
//! datasets.
//!
//! Each operation fans a dataset out into row partitions (time slices or w
//! planes) and the model image out into facets, schedules one imaging
//! operator application per (partition, facet) cell, and fans the results
//! back in: partial visibilities are summed over facets and reassembled
//! across partitions in the original row order; partial dirty images are
//! combined by weighted summation across partitions first, then placed by
//! facet. The reduction order is fixed (partitions, then facets) so that a
//! given decomposition always sums in the same sequence; floating-point
//! summation order across sibling partitions is still unspecified.
//!
//! Shape and configuration problems are reported here, at composition time,
//! not at evaluation time.

mod error;

pub use error::ComposeError;

use std::sync::Arc;

use itertools::{Itertools, MinMaxResult};
use log::debug;
use ndarray::Array2;

use crate::{
    graph::{Handle, TaskGraph, Value},
    image::{Image, SumWeights},
    imaging::Imager,
    partition::{PartitionCursor, PartitionMask, Partitions},
    vis::Visibility,
};

/// The per-row axis a dataset is partitioned along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PartitionAxis {
    /// Slice along row timestamps.
    #[default]
    Time,

    /// Stack along the w baseline coordinate.
    W,
}

/// Decomposition configuration for one composed operation.
///
/// `vis_slices` of 0 or 1 degenerates to the plain 2-D case (no row
/// partitioning; when the w term matters the caller is responsible for
/// choosing a w-aware [`Imager`] or a [`PartitionAxis::W`] decomposition).
/// `facets` is a per-axis count: 2 means 2×2 tiles; 1 means no faceting.
#[derive(Clone, Copy, Debug)]
pub struct ImagingOptions {
    pub facets: usize,
    pub vis_slices: usize,
    pub axis: PartitionAxis,
}

impl Default for ImagingOptions {
    fn default() -> ImagingOptions {
        ImagingOptions {
            facets: 1,
            vis_slices: 0,
            axis: PartitionAxis::Time,
        }
    }
}

impl ImagingOptions {
    pub fn validate(&self) -> Result<(), ComposeError> {
        if self.facets < 1 {
            return Err(ComposeError::Facets);
        }
        Ok(())
    }
}

fn check_image_matches(vis: &Visibility, image: &Image) -> Result<(), ComposeError> {
    if image.nchan() != vis.nchan() {
        return Err(ComposeError::ChannelMismatch {
            image: image.nchan(),
            vis: vis.nchan(),
        });
    }
    if image.npol() != vis.npol() {
        return Err(ComposeError::PolMismatch {
            image: image.npol(),
            vis: vis.npol(),
        });
    }
    Ok(())
}

/// The row partitions of a dataset under `options`. With `vis_slices` of 0
/// or 1 this is a single all-rows mask. Otherwise the axis range is swept
/// with `vis_slices` windows plus a trailing half-window: the window sweep's
/// half-open upper bound would drop rows sitting at exactly the axis
/// maximum, so the cursor's stop is padded past it.
pub(crate) fn partition_masks(vis: &Visibility, options: &ImagingOptions) -> Vec<PartitionMask> {
    if options.vis_slices <= 1 || vis.nrows() == 0 {
        return vec![PartitionMask::full(vis.nrows())];
    }
    let values = match options.axis {
        PartitionAxis::Time => vis.gpst_times(),
        PartitionAxis::W => vis.w_values(),
    };
    let (lo, hi) = match values.iter().cloned().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
        _ => return vec![PartitionMask::full(vis.nrows())],
    };
    if hi <= lo {
        return vec![PartitionMask::full(vis.nrows())];
    }
    let width = (hi - lo) / options.vis_slices as f64;
    let cursor = PartitionCursor::new(lo, hi + width / 2.0, width);
    Partitions::with_cursor(values, cursor).collect()
}

/// Compose the graph that predicts model visibilities for a whole dataset:
/// per-partition, per-facet predicts, summed over facets and reassembled
/// across partitions in the original row order. Returns the handle of the
/// predicted dataset.
pub fn compose_predict(
    graph: &mut TaskGraph,
    vis: &Visibility,
    model: &Image,
    options: &ImagingOptions,
    imager: &Arc<dyn Imager>,
) -> Result<Handle, ComposeError> {
    options.validate()?;
    check_image_matches(vis, model)?;
    // Fail on an indivisible facet split now, not at evaluation time.
    model.scatter_facets(options.facets)?;

    let masks = partition_masks(vis, options);
    let vis_in = graph.input("observed", Value::from(vis.clone()));
    let model_in = graph.input("model-image", Value::from(model.clone()));
    let predicted = predict_partitions(graph, vis_in, model_in, &masks, options.facets, imager);
    debug!(
        "composed predict over {} partitions x {} facets",
        masks.len(),
        options.facets * options.facets
    );
    Ok(predicted)
}

/// Compose the graph that inverts a whole dataset onto `template`'s grid.
/// Returns handles for the combined (dirty image or PSF, sum of weights).
pub fn compose_invert(
    graph: &mut TaskGraph,
    vis: &Visibility,
    template: &Image,
    options: &ImagingOptions,
    dopsf: bool,
    imager: &Arc<dyn Imager>,
) -> Result<(Handle, Handle), ComposeError> {
    options.validate()?;
    check_image_matches(vis, template)?;
    template.scatter_facets(options.facets)?;

    let masks = partition_masks(vis, options);
    let vis_in = graph.input("observed", Value::from(vis.clone()));
    let template_in = graph.input("template-image", Value::from(template.clone()));
    let handles = invert_partitions(
        graph,
        vis_in,
        template_in,
        &masks,
        options.facets,
        dopsf,
        imager,
    );
    debug!(
        "composed invert over {} partitions x {} facets",
        masks.len(),
        options.facets * options.facets
    );
    Ok(handles)
}

/// Compose predict, subtraction from the observed data, and re-inversion of
/// the difference with the same partitioning. Returns handles for the
/// residual visibility, the residual image and its sum of weights.
pub fn compose_residual(
    graph: &mut TaskGraph,
    vis: &Visibility,
    model: &Image,
    options: &ImagingOptions,
    imager: &Arc<dyn Imager>,
) -> Result<(Handle, Handle, Handle), ComposeError> {
    options.validate()?;
    check_image_matches(vis, model)?;
    model.scatter_facets(options.facets)?;

    let masks = partition_masks(vis, options);
    let vis_in = graph.input("observed", Value::from(vis.clone()));
    let model_in = graph.input("model-image", Value::from(model.clone()));
    let template_in = graph.input("template-image", Value::from(model.zeroed_copy()));

    let predicted = predict_partitions(graph, vis_in, model_in, &masks, options.facets, imager);
    let residual_vis = graph
        .add("vis-subtract", 1, &[vis_in, predicted], |inputs| {
            Ok(vec![Value::from(
                inputs[0].as_vis()?.subtract(inputs[1].as_vis()?)?,
            )])
        })
        .single();
    let (image, sumwt) = invert_partitions(
        graph,
        residual_vis,
        template_in,
        &masks,
        options.facets,
        false,
        imager,
    );
    Ok((residual_vis, image, sumwt))
}

/// Fan the model out into facet handles. A facet count of 1 short-circuits
/// to the model itself.
fn facet_handles(graph: &mut TaskGraph, image_in: Handle, facets: usize) -> Vec<Handle> {
    if facets == 1 {
        return vec![image_in];
    }
    let nfacets = facets * facets;
    let scatter = graph.add("image-scatter", nfacets, &[image_in], move |inputs| {
        let image = inputs[0].as_image()?;
        Ok(image
            .scatter_facets(facets)?
            .into_iter()
            .map(Value::from)
            .collect())
    });
    (0..nfacets).map(|i| scatter.out(i)).collect()
}

/// One select node per partition.
fn select_handles(graph: &mut TaskGraph, vis_in: Handle, masks: &[PartitionMask]) -> Vec<Handle> {
    masks
        .iter()
        .map(|mask| {
            let mask = mask.clone();
            graph
                .add("vis-select", 1, &[vis_in], move |inputs| {
                    Ok(vec![Value::from(inputs[0].as_vis()?.select_rows(&mask)?)])
                })
                .single()
        })
        .collect()
}

fn predict_partitions(
    graph: &mut TaskGraph,
    vis_in: Handle,
    model_in: Handle,
    masks: &[PartitionMask],
    facets: usize,
    imager: &Arc<dyn Imager>,
) -> Handle {
    let facet_images = facet_handles(graph, model_in, facets);
    let selects = select_handles(graph, vis_in, masks);

    let mut partials = Vec::with_capacity(selects.len());
    for &select in &selects {
        let per_facet: Vec<Handle> = facet_images
            .iter()
            .map(|&facet| {
                let imager = Arc::clone(imager);
                graph
                    .add("predict", 1, &[select, facet], move |inputs| {
                        let vis = inputs[0].as_vis()?;
                        let image = inputs[1].as_image()?;
                        Ok(vec![Value::from(imager.predict(vis, image)?)])
                    })
                    .single()
            })
            .collect();
        let partition_vis = if per_facet.len() == 1 {
            per_facet[0]
        } else {
            graph
                .add("sum-predict", 1, &per_facet, |inputs| {
                    let mut accumulated = inputs[0].as_vis()?.clone();
                    for partial in &inputs[1..] {
                        accumulated.accumulate(partial.as_vis()?)?;
                    }
                    Ok(vec![Value::from(accumulated)])
                })
                .single()
        };
        partials.push(partition_vis);
    }

    // Reassemble the per-partition predictions into a dataset-shaped result,
    // preserving the original row order.
    let assemble_masks: Vec<PartitionMask> = masks.to_vec();
    let mut inputs = vec![vis_in];
    inputs.extend(partials);
    graph
        .add("vis-assemble", 1, &inputs, move |inputs| {
            let mut out = inputs[0].as_vis()?.zeroed_copy();
            for (mask, partition) in assemble_masks.iter().zip(&inputs[1..]) {
                out.scatter_rows(mask, partition.as_vis()?)?;
            }
            Ok(vec![Value::from(out)])
        })
        .single()
}

fn invert_partitions(
    graph: &mut TaskGraph,
    vis_in: Handle,
    template_in: Handle,
    masks: &[PartitionMask],
    facets: usize,
    dopsf: bool,
    imager: &Arc<dyn Imager>,
) -> (Handle, Handle) {
    let facet_templates = facet_handles(graph, template_in, facets);
    let selects = select_handles(graph, vis_in, masks);

    // For each facet: invert every partition onto the facet grid, then
    // weighted-sum the partials. All facets share the same rows and weights,
    // so their sums of weights are identical; the first facet's is the one
    // reported.
    let mut combined_facets = Vec::with_capacity(facet_templates.len());
    let mut combined_sumwt = None;
    for &facet in &facet_templates {
        let cells: Vec<(Handle, Handle)> = selects
            .iter()
            .map(|&select| {
                let imager = Arc::clone(imager);
                let node = graph.add("invert", 2, &[select, facet], move |inputs| {
                    let vis = inputs[0].as_vis()?;
                    let template = inputs[1].as_image()?;
                    let (image, sumwt) = imager.invert(vis, template, dopsf)?;
                    Ok(vec![Value::from(image), Value::from(sumwt)])
                });
                (node.out(0), node.out(1))
            })
            .collect();

        let (facet_image, facet_sumwt) = if cells.len() == 1 {
            cells[0]
        } else {
            let mut inputs = Vec::with_capacity(cells.len() * 2);
            for (image, sumwt) in &cells {
                inputs.push(*image);
                inputs.push(*sumwt);
            }
            let node = graph.add("sum-invert", 2, &inputs, |inputs| {
                let first = inputs[0].as_image()?;
                let mut accumulated = first.zeroed_copy();
                let mut sumwt: SumWeights =
                    Array2::zeros((first.nchan(), first.npol()));
                for cell in inputs.chunks_exact(2) {
                    let image = cell[0].as_image()?;
                    let weights = cell[1].as_weights()?;
                    accumulated.scaled_accumulate(image, weights)?;
                    sumwt += weights;
                }
                accumulated.normalise(&sumwt)?;
                Ok(vec![Value::from(accumulated), Value::from(sumwt)])
            });
            (node.out(0), node.out(1))
        };
        combined_facets.push(facet_image);
        combined_sumwt.get_or_insert(facet_sumwt);
    }
    let sumwt = combined_sumwt.expect("at least one facet");

    let image = if combined_facets.len() == 1 {
        combined_facets[0]
    } else {
        let mut inputs = vec![template_in];
        inputs.extend(combined_facets);
        graph
            .add("image-gather", 1, &inputs, move |inputs| {
                let template = inputs[0].as_image()?;
                let parts: Vec<Image> = inputs[1..]
                    .iter()
                    .map(|v| v.as_image().map(Clone::clone))
                    .collect::<Result<_, _>>()?;
                Ok(vec![Value::from(template.gather_facets(facets, &parts)?)])
            })
            .single()
    };
    (image, sumwt)
}
