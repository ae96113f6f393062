//! NRRD 格式原始扫描的读取.
//!
//! 仅支持 attached header 的三维数据. 编码支持 `raw`, `gzip` 和 `ascii`.
//! 体素值统一转换为 `f32`, 以 NRRD `sizes` 的顺序 (最快变化轴在前) 组织成
//! `(x, y, z)` 三维数组.

use super::Affine;
use crate::error::VolumeError;
use flate2::read::MultiGzDecoder;
use ndarray::{Array3, ShapeBuilder};
use std::collections::BTreeMap;
use std::io::Read;
use std::mem::size_of;
use std::path::Path;

/// NRRD 体素类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NrrdType {
    /// `int8`
    I8,
    /// `uint8`
    U8,
    /// `int16`
    I16,
    /// `uint16`
    U16,
    /// `int32`
    I32,
    /// `uint32`
    U32,
    /// `int64`
    I64,
    /// `uint64`
    U64,
    /// `float`
    F32,
    /// `double`
    F64,
}

impl NrrdType {
    /// 解析 `type` 字段. 包括 NRRD 规范中所有的 C 风格别名.
    pub fn parse(s: &str) -> Option<Self> {
        let t = match s.trim() {
            "signed char" | "int8" | "int8_t" => Self::I8,
            "uchar" | "unsigned char" | "uint8" | "uint8_t" => Self::U8,
            "short" | "short int" | "signed short" | "signed short int" | "int16"
            | "int16_t" => Self::I16,
            "ushort" | "unsigned short" | "unsigned short int" | "uint16" | "uint16_t" => {
                Self::U16
            }
            "int" | "signed int" | "int32" | "int32_t" => Self::I32,
            "uint" | "unsigned int" | "uint32" | "uint32_t" => Self::U32,
            "longlong" | "long long" | "long long int" | "signed long long"
            | "signed long long int" | "int64" | "int64_t" => Self::I64,
            "ulonglong" | "unsigned long long" | "unsigned long long int" | "uint64"
            | "uint64_t" => Self::U64,
            "float" => Self::F32,
            "double" => Self::F64,
            _ => return None,
        };
        Some(t)
    }

    /// 单个体素的字节数.
    pub const fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }
}

/// 数据编码.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Encoding {
    /// 裸字节.
    Raw,
    /// gzip 压缩的裸字节.
    Gzip,
    /// 空白分隔的文本数值.
    Ascii,
}

/// 字节序.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Endian {
    /// 小端.
    Little,
    /// 大端.
    Big,
}

/// NRRD 头部. 字段名统一为去空格的小写形式 (`space directions` -> `spacedirections`).
#[derive(Clone, Debug, Default)]
pub struct NrrdHeader {
    fields: BTreeMap<String, String>,
    key_values: BTreeMap<String, String>,
}

#[inline]
fn field_key(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl NrrdHeader {
    /// 获取字段. `name` 可以是规范中的任意写法.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(&field_key(name)).map(String::as_str)
    }

    /// 获取 `key:=value` 形式的自定义键值对.
    pub fn key_value(&self, key: &str) -> Option<&str> {
        self.key_values.get(key).map(String::as_str)
    }

    fn required(&self, name: &str) -> Result<&str, VolumeError> {
        self.field(name)
            .ok_or_else(|| VolumeError::NrrdHeader(format!("missing field `{name}`")))
    }

    /// 维数.
    pub fn dimension(&self) -> Result<usize, VolumeError> {
        let d = self.required("dimension")?;
        d.trim()
            .parse()
            .map_err(|_| VolumeError::NrrdHeader(format!("bad dimension `{d}`")))
    }

    /// 各轴体素个数.
    pub fn sizes(&self) -> Result<Vec<usize>, VolumeError> {
        let s = self.required("sizes")?;
        s.split_whitespace()
            .map(|v| {
                v.parse()
                    .map_err(|_| VolumeError::NrrdHeader(format!("bad sizes `{s}`")))
            })
            .collect()
    }

    /// 体素类型.
    pub fn elem_type(&self) -> Result<NrrdType, VolumeError> {
        let t = self.required("type")?;
        NrrdType::parse(t).ok_or_else(|| VolumeError::NrrdUnsupported(format!("type `{t}`")))
    }

    /// 数据编码.
    pub fn encoding(&self) -> Result<Encoding, VolumeError> {
        let e = self.required("encoding")?;
        match e.trim() {
            "raw" => Ok(Encoding::Raw),
            "gzip" | "gz" => Ok(Encoding::Gzip),
            "ascii" | "text" | "txt" => Ok(Encoding::Ascii),
            other => Err(VolumeError::NrrdUnsupported(format!("encoding `{other}`"))),
        }
    }

    /// 字节序. 缺省为小端.
    pub fn endian(&self) -> Endian {
        match self.field("endian").map(str::trim) {
            Some("big") => Endian::Big,
            _ => Endian::Little,
        }
    }

    /// `byte skip` 字段. `-1` 表示数据位于文件末尾.
    pub fn byte_skip(&self) -> Result<i64, VolumeError> {
        match self.field("byte skip") {
            None => Ok(0),
            Some(s) => s
                .trim()
                .parse()
                .map_err(|_| VolumeError::NrrdHeader(format!("bad byte skip `{s}`"))),
        }
    }

    /// 从 `space directions` 和 `space origin` 计算仿射矩阵.
    ///
    /// 第二个返回值列出缺失或无法解析的字段. 若非空, 则对应部分退化为单位阵
    /// (方向) 或零向量 (原点).
    pub fn affine(&self) -> (Affine, Vec<String>) {
        let mut issues = vec![];

        let directions = match self.field("space directions") {
            None => {
                issues.push("`space directions` missing".to_string());
                None
            }
            Some(s) => match parse_directions(s) {
                Ok(d) => Some(d),
                Err(e) => {
                    issues.push(e);
                    None
                }
            },
        };
        let origin = match self.field("space origin") {
            None => {
                issues.push("`space origin` missing".to_string());
                None
            }
            Some(s) => match parse_vector(s.trim()) {
                Ok(v) => Some(v),
                Err(e) => {
                    issues.push(e);
                    None
                }
            },
        };

        let identity = Affine::IDENTITY;
        let directions =
            directions.unwrap_or_else(|| [0, 1, 2].map(|axis| identity.direction(axis)));
        let origin = origin.unwrap_or([0.0; 3]);
        (Affine::from_parts(directions, origin), issues)
    }
}

/// 解析 `(a,b,c)` 形式的三维向量.
fn parse_vector(s: &str) -> Result<[f64; 3], String> {
    let inner = s
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| format!("bad vector `{s}`"))?;
    let values: Vec<f64> = inner
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("bad vector `{s}`"))?;
    <[f64; 3]>::try_from(values).map_err(|_| format!("vector `{s}` is not 3D"))
}

/// 解析 `space directions`. 三维空间数据要求恰好三个非 `none` 向量.
fn parse_directions(s: &str) -> Result<[[f64; 3]; 3], String> {
    let mut out = vec![];
    let mut rest = s.trim();
    while !rest.is_empty() {
        if rest.starts_with("none") {
            return Err(format!("`space directions` has a non-spatial axis: `{s}`"));
        }
        let end = rest
            .find(')')
            .ok_or_else(|| format!("bad `space directions` `{s}`"))?;
        out.push(parse_vector(&rest[..=end])?);
        rest = rest[end + 1..].trim_start();
    }
    <[[f64; 3]; 3]>::try_from(out).map_err(|_| format!("`space directions` is not 3x3: `{s}`"))
}

/// 解析头部, 返回头部与数据起始偏移量.
fn parse_header(bytes: &[u8]) -> Result<(NrrdHeader, usize), VolumeError> {
    let mut header = NrrdHeader::default();
    let mut pos = 0;
    let mut first = true;

    loop {
        let Some(len) = bytes[pos..].iter().position(|b| *b == b'\n') else {
            return Err(VolumeError::NrrdHeader(
                "header is not terminated by an empty line".to_string(),
            ));
        };
        let raw_line = &bytes[pos..pos + len];
        pos += len + 1;

        let line = std::str::from_utf8(raw_line)
            .map_err(|_| VolumeError::NrrdHeader("header is not valid UTF-8".to_string()))?
            .trim_end_matches('\r');

        if first {
            if !line.starts_with("NRRD") {
                return Err(VolumeError::NrrdHeader(format!("bad magic `{line}`")));
            }
            first = false;
            continue;
        }
        if line.is_empty() {
            return Ok((header, pos));
        }
        if line.starts_with('#') {
            continue;
        }

        // `key:=value` 与 `field: desc` 中, 先出现的分隔符决定行的类型.
        let kv = line.find(":=");
        let fd = line.find(": ");
        match (kv, fd) {
            (Some(k), f) if f.map_or(true, |f| k < f) => {
                header
                    .key_values
                    .insert(line[..k].to_string(), line[k + 2..].to_string());
            }
            (_, Some(f)) => {
                header
                    .fields
                    .insert(field_key(&line[..f]), line[f + 2..].trim().to_string());
            }
            _ => return Err(VolumeError::NrrdHeader(format!("bad header line `{line}`"))),
        }
    }
}

macro_rules! decode_as {
    ($bytes: expr, $endian: expr, $t: ty) => {
        $bytes
            .chunks_exact(size_of::<$t>())
            .map(|c| {
                let mut buf = [0u8; size_of::<$t>()];
                buf.copy_from_slice(c);
                let v = match $endian {
                    Endian::Little => <$t>::from_le_bytes(buf),
                    Endian::Big => <$t>::from_be_bytes(buf),
                };
                v as f32
            })
            .collect::<Vec<f32>>()
    };
}

/// 将二进制数据解码为 `f32`.
fn decode_binary(bytes: &[u8], ty: NrrdType, endian: Endian) -> Vec<f32> {
    match ty {
        NrrdType::I8 => bytes.iter().map(|b| *b as i8 as f32).collect(),
        NrrdType::U8 => bytes.iter().map(|b| *b as f32).collect(),
        NrrdType::I16 => decode_as!(bytes, endian, i16),
        NrrdType::U16 => decode_as!(bytes, endian, u16),
        NrrdType::I32 => decode_as!(bytes, endian, i32),
        NrrdType::U32 => decode_as!(bytes, endian, u32),
        NrrdType::I64 => decode_as!(bytes, endian, i64),
        NrrdType::U64 => decode_as!(bytes, endian, u64),
        NrrdType::F32 => decode_as!(bytes, endian, f32),
        NrrdType::F64 => decode_as!(bytes, endian, f64),
    }
}

/// 按 `byte skip` 截取二进制数据.
fn skip_bytes(payload: &[u8], skip: i64, need: usize) -> Result<&[u8], VolumeError> {
    let start = if skip < 0 {
        payload.len().saturating_sub(need)
    } else {
        skip as usize
    };
    let end = start.checked_add(need);
    match end.and_then(|end| payload.get(start..end)) {
        Some(data) => Ok(data),
        None => Err(VolumeError::Truncated {
            expected: need,
            found: payload.len().saturating_sub(start),
        }),
    }
}

/// 一个已解码的 NRRD 三维体数据.
#[derive(Debug, Clone)]
pub struct NrrdVolume {
    /// 头部.
    pub header: NrrdHeader,

    /// 体素值, 按 `(x, y, z)` 索引.
    pub data: Array3<f32>,
}

impl NrrdVolume {
    /// 读取 `path` 处的 NRRD 文件.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VolumeError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::parse(&bytes)
    }

    /// 从完整的文件字节解析.
    pub fn parse(bytes: &[u8]) -> Result<Self, VolumeError> {
        let (header, offset) = parse_header(bytes)?;

        if header.field("data file").is_some() {
            return Err(VolumeError::NrrdUnsupported(
                "detached data file".to_string(),
            ));
        }
        let sizes = header.sizes()?;
        if header.dimension()? != 3 || sizes.len() != 3 {
            return Err(VolumeError::NotVolume3d(sizes));
        }
        let ty = header.elem_type()?;
        let overflow = || VolumeError::NrrdHeader(format!("sizes {sizes:?} overflow"));
        let count = sizes
            .iter()
            .try_fold(1usize, |acc, n| acc.checked_mul(*n))
            .ok_or_else(overflow)?;
        let need = count.checked_mul(ty.size()).ok_or_else(overflow)?;
        let body = &bytes[offset..];

        let values = match header.encoding()? {
            Encoding::Ascii => {
                let text = std::str::from_utf8(body)
                    .map_err(|_| VolumeError::NrrdHeader("ascii data is not UTF-8".to_string()))?;
                let values = text
                    .split_whitespace()
                    .take(count)
                    .map(|v| v.parse::<f64>().map(|v| v as f32))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| VolumeError::NrrdHeader(format!("bad ascii value: {e}")))?;
                if values.len() < count {
                    return Err(VolumeError::Truncated {
                        expected: count,
                        found: values.len(),
                    });
                }
                values
            }
            Encoding::Raw => {
                let data = skip_bytes(body, header.byte_skip()?, need)?;
                decode_binary(data, ty, header.endian())
            }
            Encoding::Gzip => {
                let mut inflated = vec![];
                MultiGzDecoder::new(body).read_to_end(&mut inflated)?;
                let data = skip_bytes(&inflated, header.byte_skip()?, need)?;
                decode_binary(data, ty, header.endian())
            }
        };

        // NRRD 第一个轴变化最快, 与 Fortran 序一致.
        let data = Array3::from_shape_vec((sizes[0], sizes[1], sizes[2]).f(), values)
            .map_err(|e| VolumeError::NrrdHeader(e.to_string()))?;

        Ok(Self { header, data })
    }
}
