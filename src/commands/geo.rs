use crate::args::{cmd, GeoAddArgs, GeoSearchArgs, GeoUnit, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::{Error, Result};
use crate::reply::{decode, FromReply, GeoCoordinate, GeoSearchResult};

/// Valid `GEOADD` coordinate range (EPSG:3857 limits).
const MAX_LATITUDE: f64 = 85.051_128_78;

fn check_coordinate(longitude: f64, latitude: f64) -> Result<()> {
    if !(-180.0..=180.0).contains(&longitude) || !(-MAX_LATITUDE..=MAX_LATITUDE).contains(&latitude) {
        return Err(Error::Argument(format!(
            "invalid longitude,latitude pair {longitude},{latitude}"
        )));
    }
    Ok(())
}

impl<T: Transport> Client<T> {
    /// Add `(longitude, latitude, member)` triples.
    pub async fn geoadd<M: ToArg>(
        &self,
        key: impl ToArg,
        members: impl IntoIterator<Item = (f64, f64, M)>,
        opts: &GeoAddArgs,
    ) -> Result<i64> {
        let mut args = cmd(Command::GeoAdd).key(key).opts(opts)?;
        let before = args.tokens().len();
        for (lon, lat, member) in members {
            check_coordinate(lon, lat)?;
            args.push_double(lon)?.push_double(lat)?.push(member);
        }
        if args.tokens().len() == before {
            return Err(Error::Argument("GEOADD requires at least one member".into()));
        }
        self.execute(args).await
    }

    /// Distance between two members, nil when either is missing.
    pub async fn geodist(
        &self,
        key: impl ToArg,
        member1: impl ToArg,
        member2: impl ToArg,
        unit: GeoUnit,
    ) -> Result<Option<f64>> {
        self.execute(cmd(Command::GeoDist).key(key).arg(member1).arg(member2).arg(unit.as_str()))
            .await
    }

    pub async fn geohash<M: ToArg>(&self, key: impl ToArg, members: impl IntoIterator<Item = M>) -> Result<Vec<Option<String>>> {
        let mut args = cmd(Command::GeoHash).key(key);
        args.push_all(members)?;
        self.execute(args).await
    }

    pub async fn geopos<M: ToArg>(
        &self,
        key: impl ToArg,
        members: impl IntoIterator<Item = M>,
    ) -> Result<Vec<Option<GeoCoordinate>>> {
        let mut args = cmd(Command::GeoPos).key(key);
        args.push_all(members)?;
        self.execute(args).await
    }

    /// `GEOSEARCH`; the `WITH*` flags on `opts` decide which optional
    /// parts of each hit are filled in.
    pub async fn geosearch<M: FromReply>(&self, key: impl ToArg, opts: &GeoSearchArgs) -> Result<Vec<GeoSearchResult<M>>> {
        if opts.has_store_dist() {
            return Err(Error::Argument("STOREDIST is only valid with GEOSEARCHSTORE".into()));
        }
        let (coord, dist, hash) = opts.with_flags();
        let reply = self.call(cmd(Command::GeoSearch).key(key).opts(opts)?).await?;
        decode::geo_search(reply, coord, dist, hash)
    }

    /// Number of members stored in `destination`.
    pub async fn geosearch_store(&self, destination: impl ToArg, source: impl ToArg, opts: &GeoSearchArgs) -> Result<i64> {
        if opts.has_with_flags() {
            return Err(Error::Argument("GEOSEARCHSTORE does not accept WITHCOORD, WITHDIST or WITHHASH".into()));
        }
        self.execute(cmd(Command::GeoSearchStore).key(destination).key(source).opts(opts)?)
            .await
    }

    /// Read-only `GEORADIUS_RO`, members only.
    pub async fn georadius_ro<R: FromReply>(
        &self,
        key: impl ToArg,
        longitude: f64,
        latitude: f64,
        radius: f64,
        unit: GeoUnit,
    ) -> Result<Vec<R>> {
        check_coordinate(longitude, latitude)?;
        let args = cmd(Command::GeoRadiusRo)
            .key(key)
            .double(longitude)?
            .double(latitude)?
            .double(radius)?
            .arg(unit.as_str());
        self.execute(args).await
    }

    pub async fn georadius_by_member_ro<R: FromReply>(
        &self,
        key: impl ToArg,
        member: impl ToArg,
        radius: f64,
        unit: GeoUnit,
    ) -> Result<Vec<R>> {
        let args = cmd(Command::GeoRadiusByMemberRo)
            .key(key)
            .arg(member)
            .double(radius)?
            .arg(unit.as_str());
        self.execute(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_limits() {
        assert!(check_coordinate(13.361389, 38.115556).is_ok());
        assert!(check_coordinate(180.0, -85.05112878).is_ok());
        assert!(check_coordinate(180.5, 0.0).is_err());
        assert!(check_coordinate(0.0, 86.0).is_err());
        assert!(check_coordinate(f64::NAN, 0.0).is_err());
    }
}
