use super::{CommandArgs, ToArg, WriteArgs};
use crate::error::{Error, Result};
use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeoUnit {
    #[default]
    Meters,
    Kilometers,
    Miles,
    Feet,
}

impl GeoUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meters => "m",
            Self::Kilometers => "km",
            Self::Miles => "mi",
            Self::Feet => "ft",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoOrder {
    Asc,
    Desc,
}

/// Options for `GEOADD key [NX|XX] [CH] lon lat member …`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoAddArgs {
    nx: bool,
    xx: bool,
    ch: bool,
}

impl GeoAddArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nx(mut self) -> Self {
        self.nx = true;
        self
    }

    pub fn xx(mut self) -> Self {
        self.xx = true;
        self
    }

    pub fn ch(mut self) -> Self {
        self.ch = true;
        self
    }
}

impl WriteArgs for GeoAddArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        if self.nx && self.xx {
            return Err(Error::Argument("GEOADD accepts only one of NX, XX".into()));
        }
        if self.nx {
            args.push("NX");
        }
        if self.xx {
            args.push("XX");
        }
        if self.ch {
            args.push("CH");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Origin {
    Member(Bytes),
    LonLat(f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    Radius(f64),
    Box(f64, f64),
}

/// Options for `GEOSEARCH` / `GEOSEARCHSTORE`.
///
/// An origin (`from_member` / `from_lonlat`) and a shape (`by_radius` /
/// `by_box`) are both required.
#[derive(Debug, Clone, Default)]
pub struct GeoSearchArgs {
    origin: Option<Origin>,
    shape: Option<Shape>,
    unit: GeoUnit,
    order: Option<GeoOrder>,
    count: Option<(u64, bool)>,
    with_coord: bool,
    with_dist: bool,
    with_hash: bool,
    store_dist: bool,
}

impl GeoSearchArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_member(mut self, member: impl ToArg) -> Self {
        self.origin = Some(Origin::Member(member.to_arg()));
        self
    }

    pub fn from_lonlat(mut self, longitude: f64, latitude: f64) -> Self {
        self.origin = Some(Origin::LonLat(longitude, latitude));
        self
    }

    pub fn by_radius(mut self, radius: f64, unit: GeoUnit) -> Self {
        self.shape = Some(Shape::Radius(radius));
        self.unit = unit;
        self
    }

    pub fn by_box(mut self, width: f64, height: f64, unit: GeoUnit) -> Self {
        self.shape = Some(Shape::Box(width, height));
        self.unit = unit;
        self
    }

    pub fn order(mut self, order: GeoOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Limit results; `any` returns as soon as enough matches are found.
    pub fn count(mut self, count: u64, any: bool) -> Self {
        self.count = Some((count, any));
        self
    }

    pub fn with_coord(mut self) -> Self {
        self.with_coord = true;
        self
    }

    pub fn with_dist(mut self) -> Self {
        self.with_dist = true;
        self
    }

    pub fn with_hash(mut self) -> Self {
        self.with_hash = true;
        self
    }

    /// `GEOSEARCHSTORE` only: store distances instead of geohashes.
    pub fn store_dist(mut self) -> Self {
        self.store_dist = true;
        self
    }

    /// `(coord, dist, hash)` as requested, which fixes the reply layout.
    pub(crate) fn with_flags(&self) -> (bool, bool, bool) {
        (self.with_coord, self.with_dist, self.with_hash)
    }

    pub(crate) fn has_with_flags(&self) -> bool {
        self.with_coord || self.with_dist || self.with_hash
    }

    pub(crate) fn has_store_dist(&self) -> bool {
        self.store_dist
    }
}

fn non_negative(value: f64, what: &str) -> Result<f64> {
    if value < 0.0 {
        return Err(Error::Argument(format!("GEOSEARCH {what} must not be negative")));
    }
    Ok(value)
}

impl WriteArgs for GeoSearchArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        match &self.origin {
            Some(Origin::Member(member)) => {
                args.push("FROMMEMBER").push(member);
            }
            Some(Origin::LonLat(lon, lat)) => {
                args.push("FROMLONLAT");
                args.push_double(*lon)?.push_double(*lat)?;
            }
            None => {
                return Err(Error::Argument(
                    "GEOSEARCH requires FROMMEMBER or FROMLONLAT".into(),
                ))
            }
        }
        match self.shape {
            Some(Shape::Radius(r)) => {
                args.push("BYRADIUS").push_double(non_negative(r, "radius")?)?;
            }
            Some(Shape::Box(w, h)) => {
                args.push("BYBOX")
                    .push_double(non_negative(w, "width")?)?
                    .push_double(non_negative(h, "height")?)?;
            }
            None => return Err(Error::Argument("GEOSEARCH requires BYRADIUS or BYBOX".into())),
        }
        args.push(self.unit.as_str());
        match self.order {
            Some(GeoOrder::Asc) => {
                args.push("ASC");
            }
            Some(GeoOrder::Desc) => {
                args.push("DESC");
            }
            None => {}
        }
        if let Some((count, any)) = self.count {
            if count == 0 {
                return Err(Error::Argument("GEOSEARCH COUNT must be positive".into()));
            }
            args.push("COUNT").push(count);
            if any {
                args.push("ANY");
            }
        }
        if self.with_coord {
            args.push("WITHCOORD");
        }
        if self.with_dist {
            args.push("WITHDIST");
        }
        if self.with_hash {
            args.push("WITHHASH");
        }
        if self.store_dist {
            args.push("STOREDIST");
        }
        Ok(())
    }
}
