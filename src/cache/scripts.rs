//! Server-side Lua sources for the atomic operations
//!
//! Each script validates key types before its first write, so a rejected
//! call leaves the store untouched.

/// KEYS = [entry_key, dep_key...], ARGV = [value, ttl_seconds?]
pub const SET_WITH_DEPENDENCIES: &str = r#"
local entry_key = KEYS[1]
local value = ARGV[1]
local ttl = nil
if ARGV[2] then
    ttl = tonumber(ARGV[2])
    if not ttl or ttl <= 0 then
        return redis.error_reply('ERR invalid ttl ' .. tostring(ARGV[2]))
    end
end

if string.sub(entry_key, 1, 5) == 'deps:' then
    return redis.error_reply('ERR entry key ' .. entry_key .. ' overlaps the dependency namespace')
end

for i = 2, #KEYS do
    if KEYS[i] == entry_key then
        return redis.error_reply('ERR entry key ' .. entry_key .. ' overlaps the dependency namespace')
    end
    local kind = redis.call('TYPE', KEYS[i]).ok
    if kind ~= 'set' and kind ~= 'none' then
        return redis.error_reply('WRONGTYPE dependency key ' .. KEYS[i] .. ' holds a ' .. kind)
    end
end

if ttl then
    redis.call('SET', entry_key, value, 'EX', ttl)
else
    redis.call('SET', entry_key, value)
end

for i = 2, #KEYS do
    local dep_key = KEYS[i]
    local previous_ttl = redis.call('TTL', dep_key)
    redis.call('SADD', dep_key, entry_key)

    if ttl then
        if previous_ttl == -2 or (previous_ttl > 0 and previous_ttl < ttl) then
            redis.call('EXPIRE', dep_key, ttl)
        end
    elseif previous_ttl > 0 then
        redis.call('PERSIST', dep_key)
    end
end

return {}
"#;

/// KEYS = [dep_key...], returns the deleted entry keys
pub const INVALIDATE_DEPENDENTS: &str = r#"
local victims = redis.call('SUNION', unpack(KEYS))

local batch = 1000
for i = 1, #victims, batch do
    redis.call('DEL', unpack(victims, i, math.min(i + batch - 1, #victims)))
end
redis.call('DEL', unpack(KEYS))

return victims
"#;

/// KEYS = [dep_key], returns the pruned members
pub const PRUNE_DEPENDENCY_SET: &str = r#"
local dep_key = KEYS[1]
local pruned = {}

if redis.call('TYPE', dep_key).ok ~= 'set' then
    return pruned
end

for _, member in ipairs(redis.call('SMEMBERS', dep_key)) do
    if redis.call('EXISTS', member) == 0 then
        redis.call('SREM', dep_key, member)
        table.insert(pruned, member)
    end
end

return pruned
"#;
