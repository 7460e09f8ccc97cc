pub use anyhow::{bail, ensure, format_err, Error, Result};
pub use itertools::izip;
pub use log::{debug, warn};
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::Borrow,
    fmt::{self, Display, Formatter},
    iter,
    str::FromStr,
};
pub use strum::{AsRefStr, EnumString};
pub use tch::{nn, Device, Kind, Tensor};
