//! Static command registry.
//!
//! Every command the client can issue is a [`Command`] variant backed by one
//! immutable [`CommandInfo`] row: wire name, group, behaviour flags and the
//! recognised sub-commands. Enum and table come from the single declaration
//! list in [`commands!`], so they cannot drift apart.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Behaviour of a command as seen by the dispatcher and the mode gate.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandFlags: u16 {
        /// Only reads data; safe to resend after a transport failure.
        const READ         = 1 << 0;
        /// Modifies the dataset; never resent silently once written.
        const WRITE        = 1 << 1;
        /// May park the connection server-side until data arrives.
        const BLOCKING     = 1 << 2;
        /// Administrative / server-wide command.
        const ADMIN        = 1 << 3;
        /// Meaningless or unsafe against a cluster.
        const NO_CLUSTER   = 1 << 4;
        /// Only valid against a cluster node.
        const CLUSTER_ONLY = 1 << 5;
        /// Publish side of pub/sub.
        const PUBSUB       = 1 << 6;
        /// Runs server-side scripts or functions.
        const SCRIPTING    = 1 << 7;
        /// Changes per-connection transaction state.
        const TRANSACTION  = 1 << 8;
    }
}

/// Command family, as tagged in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Connection,
    Key,
    String,
    Hash,
    List,
    Set,
    SortedSet,
    Stream,
    Geo,
    Bitmap,
    HyperLogLog,
    Scripting,
    PubSub,
    Server,
    Cluster,
    Acl,
    Transaction,
    Sentinel,
}

/// One registry row.
#[derive(Debug)]
pub struct CommandInfo {
    pub name: &'static str,
    pub group: Group,
    pub flags: CommandFlags,
    /// Recognised sub-commands; empty when the command takes none.
    pub subcommands: &'static [&'static str],
}

impl CommandInfo {
    pub fn has_subcommand(&self, sub: &[u8]) -> bool {
        self.subcommands
            .iter()
            .any(|s| s.as_bytes().eq_ignore_ascii_case(sub))
    }
}

macro_rules! commands {
    ($(
        $variant:ident => $name:literal, $group:ident, [$($flag:ident)|*] $(, subs: [$($sub:literal),* $(,)?])?;
    )*) => {
        /// Every command known to the client.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Command {
            $($variant,)*
        }

        static TABLE: &[CommandInfo] = &[
            $(CommandInfo {
                name: $name,
                group: Group::$group,
                flags: CommandFlags::empty()$(.union(CommandFlags::$flag))*,
                subcommands: &[$($($sub),*)?],
            },)*
        ];

        impl Command {
            /// All variants in declaration order.
            pub const ALL: &'static [Command] = &[$(Command::$variant,)*];
        }
    };
}

commands! {
    // connection
    Auth => "AUTH", Connection, [];
    Ping => "PING", Connection, [READ];
    Echo => "ECHO", Connection, [READ];
    Select => "SELECT", Connection, [NO_CLUSTER];
    Hello => "HELLO", Connection, [];
    Client => "CLIENT", Connection, [ADMIN], subs: [
        "CACHING", "GETNAME", "GETREDIR", "ID", "INFO", "KILL", "LIST", "NO-EVICT",
        "NO-TOUCH", "PAUSE", "REPLY", "SETINFO", "SETNAME", "TRACKING",
        "TRACKINGINFO", "UNBLOCK", "UNPAUSE",
    ];
    Asking => "ASKING", Connection, [CLUSTER_ONLY];
    ReadOnly => "READONLY", Connection, [CLUSTER_ONLY];
    ReadWrite => "READWRITE", Connection, [CLUSTER_ONLY];

    // keys
    Copy => "COPY", Key, [WRITE];
    Del => "DEL", Key, [WRITE];
    Dump => "DUMP", Key, [READ];
    Exists => "EXISTS", Key, [READ];
    Expire => "EXPIRE", Key, [WRITE];
    ExpireAt => "EXPIREAT", Key, [WRITE];
    ExpireTime => "EXPIRETIME", Key, [READ];
    Keys => "KEYS", Key, [READ];
    Migrate => "MIGRATE", Key, [WRITE];
    Move => "MOVE", Key, [WRITE | NO_CLUSTER];
    Object => "OBJECT", Key, [READ], subs: ["ENCODING", "FREQ", "IDLETIME", "REFCOUNT"];
    Persist => "PERSIST", Key, [WRITE];
    PExpire => "PEXPIRE", Key, [WRITE];
    PExpireAt => "PEXPIREAT", Key, [WRITE];
    PExpireTime => "PEXPIRETIME", Key, [READ];
    PTtl => "PTTL", Key, [READ];
    RandomKey => "RANDOMKEY", Key, [READ];
    Rename => "RENAME", Key, [WRITE];
    RenameNx => "RENAMENX", Key, [WRITE];
    Restore => "RESTORE", Key, [WRITE];
    Scan => "SCAN", Key, [READ];
    Sort => "SORT", Key, [WRITE];
    SortRo => "SORT_RO", Key, [READ];
    Touch => "TOUCH", Key, [READ];
    Ttl => "TTL", Key, [READ];
    Type => "TYPE", Key, [READ];
    Unlink => "UNLINK", Key, [WRITE];

    // strings
    Append => "APPEND", String, [WRITE];
    Decr => "DECR", String, [WRITE];
    DecrBy => "DECRBY", String, [WRITE];
    Get => "GET", String, [READ];
    GetDel => "GETDEL", String, [WRITE];
    GetEx => "GETEX", String, [WRITE];
    GetRange => "GETRANGE", String, [READ];
    GetSet => "GETSET", String, [WRITE];
    Incr => "INCR", String, [WRITE];
    IncrBy => "INCRBY", String, [WRITE];
    IncrByFloat => "INCRBYFLOAT", String, [WRITE];
    Lcs => "LCS", String, [READ];
    MGet => "MGET", String, [READ];
    MSet => "MSET", String, [WRITE];
    MSetNx => "MSETNX", String, [WRITE];
    PSetEx => "PSETEX", String, [WRITE];
    Set => "SET", String, [WRITE];
    SetEx => "SETEX", String, [WRITE];
    SetNx => "SETNX", String, [WRITE];
    SetRange => "SETRANGE", String, [WRITE];
    StrLen => "STRLEN", String, [READ];

    // hashes
    HDel => "HDEL", Hash, [WRITE];
    HExists => "HEXISTS", Hash, [READ];
    HGet => "HGET", Hash, [READ];
    HGetAll => "HGETALL", Hash, [READ];
    HIncrBy => "HINCRBY", Hash, [WRITE];
    HIncrByFloat => "HINCRBYFLOAT", Hash, [WRITE];
    HKeys => "HKEYS", Hash, [READ];
    HLen => "HLEN", Hash, [READ];
    HMGet => "HMGET", Hash, [READ];
    HMSet => "HMSET", Hash, [WRITE];
    HRandField => "HRANDFIELD", Hash, [READ];
    HScan => "HSCAN", Hash, [READ];
    HSet => "HSET", Hash, [WRITE];
    HSetNx => "HSETNX", Hash, [WRITE];
    HStrLen => "HSTRLEN", Hash, [READ];
    HVals => "HVALS", Hash, [READ];

    // lists
    BLMove => "BLMOVE", List, [WRITE | BLOCKING];
    BLMPop => "BLMPOP", List, [WRITE | BLOCKING];
    BLPop => "BLPOP", List, [WRITE | BLOCKING];
    BRPop => "BRPOP", List, [WRITE | BLOCKING];
    BRPopLPush => "BRPOPLPUSH", List, [WRITE | BLOCKING];
    LIndex => "LINDEX", List, [READ];
    LInsert => "LINSERT", List, [WRITE];
    LLen => "LLEN", List, [READ];
    LMove => "LMOVE", List, [WRITE];
    LMPop => "LMPOP", List, [WRITE];
    LPop => "LPOP", List, [WRITE];
    LPos => "LPOS", List, [READ];
    LPush => "LPUSH", List, [WRITE];
    LPushX => "LPUSHX", List, [WRITE];
    LRange => "LRANGE", List, [READ];
    LRem => "LREM", List, [WRITE];
    LSet => "LSET", List, [WRITE];
    LTrim => "LTRIM", List, [WRITE];
    RPop => "RPOP", List, [WRITE];
    RPopLPush => "RPOPLPUSH", List, [WRITE];
    RPush => "RPUSH", List, [WRITE];
    RPushX => "RPUSHX", List, [WRITE];

    // sets
    SAdd => "SADD", Set, [WRITE];
    SCard => "SCARD", Set, [READ];
    SDiff => "SDIFF", Set, [READ];
    SDiffStore => "SDIFFSTORE", Set, [WRITE];
    SInter => "SINTER", Set, [READ];
    SInterCard => "SINTERCARD", Set, [READ];
    SInterStore => "SINTERSTORE", Set, [WRITE];
    SIsMember => "SISMEMBER", Set, [READ];
    SMembers => "SMEMBERS", Set, [READ];
    SMIsMember => "SMISMEMBER", Set, [READ];
    SMove => "SMOVE", Set, [WRITE];
    SPop => "SPOP", Set, [WRITE];
    SRandMember => "SRANDMEMBER", Set, [READ];
    SRem => "SREM", Set, [WRITE];
    SScan => "SSCAN", Set, [READ];
    SUnion => "SUNION", Set, [READ];
    SUnionStore => "SUNIONSTORE", Set, [WRITE];

    // sorted sets
    BZMPop => "BZMPOP", SortedSet, [WRITE | BLOCKING];
    BZPopMax => "BZPOPMAX", SortedSet, [WRITE | BLOCKING];
    BZPopMin => "BZPOPMIN", SortedSet, [WRITE | BLOCKING];
    ZAdd => "ZADD", SortedSet, [WRITE];
    ZCard => "ZCARD", SortedSet, [READ];
    ZCount => "ZCOUNT", SortedSet, [READ];
    ZDiff => "ZDIFF", SortedSet, [READ];
    ZDiffStore => "ZDIFFSTORE", SortedSet, [WRITE];
    ZIncrBy => "ZINCRBY", SortedSet, [WRITE];
    ZInter => "ZINTER", SortedSet, [READ];
    ZInterCard => "ZINTERCARD", SortedSet, [READ];
    ZInterStore => "ZINTERSTORE", SortedSet, [WRITE];
    ZLexCount => "ZLEXCOUNT", SortedSet, [READ];
    ZMPop => "ZMPOP", SortedSet, [WRITE];
    ZMScore => "ZMSCORE", SortedSet, [READ];
    ZPopMax => "ZPOPMAX", SortedSet, [WRITE];
    ZPopMin => "ZPOPMIN", SortedSet, [WRITE];
    ZRandMember => "ZRANDMEMBER", SortedSet, [READ];
    ZRange => "ZRANGE", SortedSet, [READ];
    ZRangeByLex => "ZRANGEBYLEX", SortedSet, [READ];
    ZRangeByScore => "ZRANGEBYSCORE", SortedSet, [READ];
    ZRangeStore => "ZRANGESTORE", SortedSet, [WRITE];
    ZRank => "ZRANK", SortedSet, [READ];
    ZRem => "ZREM", SortedSet, [WRITE];
    ZRemRangeByLex => "ZREMRANGEBYLEX", SortedSet, [WRITE];
    ZRemRangeByRank => "ZREMRANGEBYRANK", SortedSet, [WRITE];
    ZRemRangeByScore => "ZREMRANGEBYSCORE", SortedSet, [WRITE];
    ZRevRange => "ZREVRANGE", SortedSet, [READ];
    ZRevRangeByScore => "ZREVRANGEBYSCORE", SortedSet, [READ];
    ZRevRank => "ZREVRANK", SortedSet, [READ];
    ZScan => "ZSCAN", SortedSet, [READ];
    ZScore => "ZSCORE", SortedSet, [READ];
    ZUnion => "ZUNION", SortedSet, [READ];
    ZUnionStore => "ZUNIONSTORE", SortedSet, [WRITE];

    // streams
    XAck => "XACK", Stream, [WRITE];
    XAdd => "XADD", Stream, [WRITE];
    XAutoClaim => "XAUTOCLAIM", Stream, [WRITE];
    XClaim => "XCLAIM", Stream, [WRITE];
    XDel => "XDEL", Stream, [WRITE];
    XGroup => "XGROUP", Stream, [WRITE], subs: [
        "CREATE", "CREATECONSUMER", "DELCONSUMER", "DESTROY", "SETID",
    ];
    XInfo => "XINFO", Stream, [READ], subs: ["CONSUMERS", "GROUPS", "STREAM"];
    XLen => "XLEN", Stream, [READ];
    XPending => "XPENDING", Stream, [READ];
    XRange => "XRANGE", Stream, [READ];
    XRead => "XREAD", Stream, [READ];
    XReadGroup => "XREADGROUP", Stream, [WRITE];
    XRevRange => "XREVRANGE", Stream, [READ];
    XTrim => "XTRIM", Stream, [WRITE];

    // geo
    GeoAdd => "GEOADD", Geo, [WRITE];
    GeoDist => "GEODIST", Geo, [READ];
    GeoHash => "GEOHASH", Geo, [READ];
    GeoPos => "GEOPOS", Geo, [READ];
    GeoRadius => "GEORADIUS", Geo, [WRITE];
    GeoRadiusByMember => "GEORADIUSBYMEMBER", Geo, [WRITE];
    GeoRadiusByMemberRo => "GEORADIUSBYMEMBER_RO", Geo, [READ];
    GeoRadiusRo => "GEORADIUS_RO", Geo, [READ];
    GeoSearch => "GEOSEARCH", Geo, [READ];
    GeoSearchStore => "GEOSEARCHSTORE", Geo, [WRITE];

    // bitmaps
    BitCount => "BITCOUNT", Bitmap, [READ];
    BitField => "BITFIELD", Bitmap, [WRITE];
    BitFieldRo => "BITFIELD_RO", Bitmap, [READ];
    BitOp => "BITOP", Bitmap, [WRITE];
    BitPos => "BITPOS", Bitmap, [READ];
    GetBit => "GETBIT", Bitmap, [READ];
    SetBit => "SETBIT", Bitmap, [WRITE];

    // hyperloglog
    PfAdd => "PFADD", HyperLogLog, [WRITE];
    PfCount => "PFCOUNT", HyperLogLog, [READ];
    PfMerge => "PFMERGE", HyperLogLog, [WRITE];

    // scripting
    Eval => "EVAL", Scripting, [WRITE | SCRIPTING];
    EvalRo => "EVAL_RO", Scripting, [READ | SCRIPTING];
    EvalSha => "EVALSHA", Scripting, [WRITE | SCRIPTING];
    EvalShaRo => "EVALSHA_RO", Scripting, [READ | SCRIPTING];
    FCall => "FCALL", Scripting, [WRITE | SCRIPTING];
    FCallRo => "FCALL_RO", Scripting, [READ | SCRIPTING];
    Function => "FUNCTION", Scripting, [ADMIN | SCRIPTING], subs: [
        "DELETE", "DUMP", "FLUSH", "KILL", "LIST", "LOAD", "RESTORE", "STATS",
    ];
    Script => "SCRIPT", Scripting, [ADMIN | SCRIPTING], subs: ["EXISTS", "FLUSH", "KILL", "LOAD"];

    // pub/sub
    Publish => "PUBLISH", PubSub, [PUBSUB];
    PubSubCmd => "PUBSUB", PubSub, [READ | PUBSUB], subs: [
        "CHANNELS", "NUMPAT", "NUMSUB", "SHARDCHANNELS", "SHARDNUMSUB",
    ];
    SPublish => "SPUBLISH", PubSub, [PUBSUB];

    // server
    BgRewriteAof => "BGREWRITEAOF", Server, [ADMIN];
    BgSave => "BGSAVE", Server, [ADMIN];
    CommandCmd => "COMMAND", Server, [READ], subs: ["COUNT", "DOCS", "GETKEYS", "INFO", "LIST"];
    Config => "CONFIG", Server, [ADMIN], subs: ["GET", "RESETSTAT", "REWRITE", "SET"];
    DbSize => "DBSIZE", Server, [READ];
    FlushAll => "FLUSHALL", Server, [WRITE];
    FlushDb => "FLUSHDB", Server, [WRITE];
    Info => "INFO", Server, [READ];
    LastSave => "LASTSAVE", Server, [READ];
    Memory => "MEMORY", Server, [READ], subs: ["DOCTOR", "MALLOC-STATS", "PURGE", "STATS", "USAGE"];
    Role => "ROLE", Server, [READ];
    Save => "SAVE", Server, [ADMIN];
    SlowLog => "SLOWLOG", Server, [ADMIN], subs: ["GET", "LEN", "RESET"];
    SwapDb => "SWAPDB", Server, [WRITE | NO_CLUSTER];
    Time => "TIME", Server, [READ];
    Wait => "WAIT", Server, [BLOCKING];
    WaitAof => "WAITAOF", Server, [BLOCKING];

    // cluster
    Cluster => "CLUSTER", Cluster, [CLUSTER_ONLY], subs: [
        "ADDSLOTS", "ADDSLOTSRANGE", "BUMPEPOCH", "COUNT-FAILURE-REPORTS",
        "COUNTKEYSINSLOT", "DELSLOTS", "DELSLOTSRANGE", "FAILOVER", "FLUSHSLOTS",
        "FORGET", "GETKEYSINSLOT", "INFO", "KEYSLOT", "LINKS", "MEET", "MYID",
        "MYSHARDID", "NODES", "REPLICAS", "REPLICATE", "RESET", "SAVECONFIG",
        "SET-CONFIG-EPOCH", "SETSLOT", "SHARDS", "SLOTS",
    ];

    // acl
    Acl => "ACL", Acl, [ADMIN], subs: [
        "CAT", "DELUSER", "DRYRUN", "GENPASS", "GETUSER", "LIST", "LOAD", "LOG",
        "SAVE", "SETUSER", "USERS", "WHOAMI",
    ];

    // transactions
    Discard => "DISCARD", Transaction, [TRANSACTION];
    Exec => "EXEC", Transaction, [TRANSACTION];
    Multi => "MULTI", Transaction, [TRANSACTION];
    Unwatch => "UNWATCH", Transaction, [TRANSACTION];
    Watch => "WATCH", Transaction, [TRANSACTION];

    // sentinel
    Sentinel => "SENTINEL", Sentinel, [ADMIN | NO_CLUSTER], subs: [
        "CKQUORUM", "FAILOVER", "GET-MASTER-ADDR-BY-NAME", "MASTER", "MASTERS",
        "REPLICAS", "RESET", "SENTINELS",
    ];
}

impl Command {
    pub fn info(self) -> &'static CommandInfo {
        &TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn flags(self) -> CommandFlags {
        self.info().flags
    }

    pub fn group(self) -> Group {
        self.info().group
    }

    pub fn is_read(self) -> bool {
        self.flags().contains(CommandFlags::READ)
    }

    pub fn is_write(self) -> bool {
        self.flags().contains(CommandFlags::WRITE)
    }

    pub fn is_blocking(self) -> bool {
        self.flags().contains(CommandFlags::BLOCKING)
    }

    /// Case-insensitive lookup by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Tests ──────────────────────────────────────────────────────────
