use ndarray::Array2;

use crate::feature::{Feature, FeatureCollection};

use super::geotransform::GeoTransform;
use super::image::Image;

/// Sample every band of `image` at each feature's location.
///
/// The output features carry one property per band plus the listed
/// `keep` properties copied from the input. Features outside the grid or on
/// a masked pixel are dropped.
pub fn sample_regions(image: &Image, collection: &FeatureCollection, keep: &[&str]) -> FeatureCollection {
    let names = image.band_names();
    collection
        .iter()
        .filter_map(|f| {
            let values = image.sample_at(f.x, f.y)?;
            let mut out = Feature::new(f.x, f.y);
            for (name, v) in names.iter().zip(values) {
                out.set(*name, v);
            }
            for prop in keep {
                if let Some(v) = f.properties.get(*prop) {
                    out.set(*prop, *v);
                }
            }
            Some(out)
        })
        .collect()
}

/// Burn features into a single-band image holding the per-pixel mean of
/// `property`.
///
/// Features with a null `property` or outside the grid are ignored; pixels
/// without any feature are masked. The band is named `mean`.
pub fn reduce_to_image(
    collection: &FeatureCollection,
    property: &str,
    transform: GeoTransform,
    dim: (usize, usize),
) -> Image {
    let mut sum = Array2::<f64>::zeros(dim);
    let mut count = Array2::<u32>::zeros(dim);

    for f in collection.filter_not_null(property).iter() {
        let Some((r, c)) = transform.index_of(f.x, f.y, dim) else {
            continue;
        };
        if let Some(v) = f.get(property) {
            sum[[r, c]] += v;
            count[[r, c]] += 1;
        }
    }

    let mut mean = Array2::from_elem(dim, f64::NAN);
    ndarray::Zip::from(&mut mean)
        .and(&sum)
        .and(&count)
        .for_each(|m, &s, &n| {
            if n > 0 {
                *m = s / n as f64;
            }
        });
    Image::single(transform, "mean", mean)
}
