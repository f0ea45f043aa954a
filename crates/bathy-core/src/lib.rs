pub mod cloud;
pub mod consts;
pub mod div;
pub mod error;
pub mod feature;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod raster;
pub mod reduce;
pub mod reference;
pub mod region;
pub mod regress;
pub mod render;
pub mod report;
pub mod source;
pub mod water;
